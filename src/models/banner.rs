use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BannerStatus {
    Active,
    Inactive,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Banner {
    pub banner_id: i64,
    pub title: String,
    pub image_path: String,
    pub status: BannerStatus,
    pub uploaded_by: Option<i64>,
    pub uploaded_by_name: Option<String>,
    pub uploaded_at: OffsetDateTime,
}

const BANNER_SELECT: &str =
    "SELECT b.banner_id, b.title, b.image_path, b.status, b.uploaded_by,
            u.username AS uploaded_by_name, b.uploaded_at
     FROM banners b
     LEFT JOIN users u ON b.uploaded_by = u.user_id";

#[derive(Debug, Default, Deserialize)]
pub struct BannerUpdate {
    pub title: Option<String>,
    pub image_path: Option<String>,
    pub status: Option<BannerStatus>,
}

impl Banner {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{BANNER_SELECT} ORDER BY b.uploaded_at DESC"))
            .fetch_all(pool)
            .await
    }

    pub async fn with_id(banner_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{BANNER_SELECT} WHERE b.banner_id = ?"))
            .bind(banner_id)
            .fetch_optional(pool)
            .await
    }

    /// The banner currently shown on the public site, if any.
    pub async fn active(pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{BANNER_SELECT} WHERE b.status = 'active'"))
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        title: &str,
        image_path: &str,
        status: BannerStatus,
        uploaded_by: i64,
        pool: &SqlitePool,
    ) -> sqlx::Result<Self> {
        let result = sqlx::query(
            "INSERT INTO banners (title, image_path, status, uploaded_by, uploaded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(image_path)
        .bind(status)
        .bind(uploaded_by)
        .bind(util::now())
        .execute(pool)
        .await?;

        Self::with_id(result.last_insert_rowid(), pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Partial update with keep-if-absent semantics. Activating a banner
    /// deactivates every other one in the same transaction, so at most one
    /// row ends up active.
    pub async fn update(
        banner_id: i64,
        update: &BannerUpdate,
        pool: &SqlitePool,
    ) -> sqlx::Result<Option<Self>> {
        let mut tx = pool.begin().await?;

        if update.status == Some(BannerStatus::Active) {
            sqlx::query("UPDATE banners SET status = 'inactive' WHERE status = 'active'")
                .execute(&mut tx)
                .await?;
        }

        let result = sqlx::query(
            "UPDATE banners
             SET title = COALESCE(?, title),
                 image_path = COALESCE(?, image_path),
                 status = COALESCE(?, status)
             WHERE banner_id = ?",
        )
        .bind(&update.title)
        .bind(&update.image_path)
        .bind(update.status)
        .bind(banner_id)
        .execute(&mut tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;

        Self::with_id(banner_id, pool).await
    }

    pub async fn delete(banner_id: i64, pool: &SqlitePool) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM banners WHERE banner_id = ?")
            .bind(banner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
