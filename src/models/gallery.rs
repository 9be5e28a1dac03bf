use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::util;

#[derive(Debug, Serialize, FromRow)]
pub struct GalleryImage {
    pub image_id: i64,
    pub title: String,
    pub description: String,
    pub image_path: String,
    pub uploaded_by: Option<i64>,
    pub uploaded_by_name: Option<String>,
    pub uploaded_at: OffsetDateTime,
    pub related_event: Option<i64>,
    pub event_title: Option<String>,
    pub related_member: Option<i64>,
    pub member_name: Option<String>,
}

const GALLERY_SELECT: &str =
    "SELECT g.image_id, g.title, g.description, g.image_path, g.uploaded_by,
            u.username AS uploaded_by_name, g.uploaded_at,
            g.related_event, e.title AS event_title,
            g.related_member, m.full_name AS member_name
     FROM image_gallery g
     LEFT JOIN users u ON g.uploaded_by = u.user_id
     LEFT JOIN events e ON g.related_event = e.event_id
     LEFT JOIN members m ON g.related_member = m.member_id";

impl GalleryImage {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{GALLERY_SELECT} ORDER BY g.uploaded_at DESC"))
            .fetch_all(pool)
            .await
    }

    pub async fn with_id(image_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{GALLERY_SELECT} WHERE g.image_id = ?"))
            .bind(image_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        title: &str,
        description: &str,
        image_path: &str,
        uploaded_by: i64,
        related_event: Option<i64>,
        pool: &SqlitePool,
    ) -> sqlx::Result<Self> {
        let result = sqlx::query(
            "INSERT INTO image_gallery (title, description, image_path, uploaded_by,
                                        uploaded_at, related_event)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(image_path)
        .bind(uploaded_by)
        .bind(util::now())
        .bind(related_event)
        .execute(pool)
        .await?;

        Self::with_id(result.last_insert_rowid(), pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(image_id: i64, pool: &SqlitePool) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM image_gallery WHERE image_id = ?")
            .bind(image_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The public listing, with stored paths turned into servable URLs.
    pub async fn public_list(
        uploads_mount: &str,
        pool: &SqlitePool,
    ) -> sqlx::Result<Vec<PublicImage>> {
        let rows: Vec<PublicImageRow> = sqlx::query_as(
            "SELECT image_id AS id, title, description, image_path, uploaded_at AS created_at
             FROM image_gallery
             ORDER BY uploaded_at DESC",
        )
        .fetch_all(pool)
        .await?;

        let mount = uploads_mount.trim_end_matches('/');
        Ok(rows
            .into_iter()
            .map(|row| PublicImage {
                id: row.id,
                title: row.title,
                description: row.description,
                url: format!("{}/{}", mount, row.image_path),
                created_at: row.created_at,
            })
            .collect())
    }
}

#[derive(Debug, FromRow)]
struct PublicImageRow {
    id: i64,
    title: String,
    description: String,
    image_path: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct PublicImage {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub url: String,
    pub created_at: OffsetDateTime,
}
