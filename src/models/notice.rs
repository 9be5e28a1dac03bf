use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum NoticeStatus {
    Published,
    Draft,
}

/// An announcement, joined with the posting user's name for display.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Notice {
    pub notice_id: i64,
    pub title: String,
    pub content: String,
    pub created_by: Option<i64>,
    pub created_by_name: Option<String>,
    pub status: NoticeStatus,
    pub event_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

const NOTICE_SELECT: &str =
    "SELECT n.notice_id, n.title, n.content, n.created_by, u.username AS created_by_name,
            n.status, n.event_date, n.created_at, n.updated_at
     FROM notices n
     LEFT JOIN users u ON n.created_by = u.user_id";

/// The shape the public site renders news items in.
#[derive(Debug, Serialize, FromRow)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub event_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

const NEWS_SELECT: &str =
    "SELECT notice_id AS id, title, content, event_date, created_at, updated_at FROM notices";

impl Notice {
    pub async fn published(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{NOTICE_SELECT} WHERE n.status = 'Published' ORDER BY n.created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn with_id(notice_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{NOTICE_SELECT} WHERE n.notice_id = ?"))
            .bind(notice_id)
            .fetch_optional(pool)
            .await
    }

    /// New notices go straight to Published.
    pub async fn create(
        title: &str,
        content: &str,
        created_by: i64,
        pool: &SqlitePool,
    ) -> sqlx::Result<Self> {
        let result = sqlx::query(
            "INSERT INTO notices (title, content, created_by, status, created_at)
             VALUES (?, ?, ?, 'Published', ?)",
        )
        .bind(title)
        .bind(content)
        .bind(created_by)
        .bind(util::now())
        .execute(pool)
        .await?;

        Self::with_id(result.last_insert_rowid(), pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(notice_id: i64, pool: &SqlitePool) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM notices WHERE notice_id = ?")
            .bind(notice_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn news(pool: &SqlitePool) -> sqlx::Result<Vec<NewsItem>> {
        sqlx::query_as(&format!(
            "{NEWS_SELECT} WHERE status = 'Published' ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn news_detail(id: i64, pool: &SqlitePool) -> sqlx::Result<Option<NewsItem>> {
        sqlx::query_as(&format!(
            "{NEWS_SELECT} WHERE notice_id = ? AND status = 'Published'"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
