//! Site-wide search: five independent substring queries, up to five rows
//! each, concatenated into one flat list. No ranking and no deduplication
//! across sources.

use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{FromRow, SqlitePool};
use time::{Date, OffsetDateTime};

const PER_SOURCE_LIMIT: i64 = 5;

pub async fn search(query: &str, pool: &SqlitePool) -> sqlx::Result<Vec<Value>> {
    let term = format!("%{}%", query);
    let mut results = Vec::new();

    let news: Vec<NewsHit> = sqlx::query_as(
        "SELECT notice_id AS id, title, content, created_at AS date
         FROM notices
         WHERE (title LIKE ? OR content LIKE ?) AND status = 'Published'
         ORDER BY created_at DESC
         LIMIT ?",
    )
    .bind(&term)
    .bind(&term)
    .bind(PER_SOURCE_LIMIT)
    .fetch_all(pool)
    .await?;
    results.extend(news.into_iter().map(|hit| tagged(hit, "news")));

    let events: Vec<EventHit> = sqlx::query_as(
        "SELECT event_id AS id, title, description AS content, start_date AS date
         FROM events
         WHERE (title LIKE ? OR description LIKE ?) AND status IN ('Upcoming', 'Ongoing')
         ORDER BY start_date DESC
         LIMIT ?",
    )
    .bind(&term)
    .bind(&term)
    .bind(PER_SOURCE_LIMIT)
    .fetch_all(pool)
    .await?;
    results.extend(events.into_iter().map(|hit| tagged(hit, "event")));

    let gallery: Vec<GalleryHit> = sqlx::query_as(
        "SELECT image_id AS id, title, description AS content, uploaded_at AS date
         FROM image_gallery
         WHERE title LIKE ? OR description LIKE ?
         ORDER BY uploaded_at DESC
         LIMIT ?",
    )
    .bind(&term)
    .bind(&term)
    .bind(PER_SOURCE_LIMIT)
    .fetch_all(pool)
    .await?;
    results.extend(gallery.into_iter().map(|hit| tagged(hit, "gallery")));

    let members: Vec<MemberHit> = sqlx::query_as(
        "SELECT member_id AS id, full_name, designation AS position, email, phone,
                joined_date AS date
         FROM members
         WHERE (full_name LIKE ? OR designation LIKE ?) AND status = 'Active'
         ORDER BY joined_date DESC
         LIMIT ?",
    )
    .bind(&term)
    .bind(&term)
    .bind(PER_SOURCE_LIMIT)
    .fetch_all(pool)
    .await?;
    results.extend(members.into_iter().map(|hit| tagged(hit, "member")));

    let committee: Vec<CommitteeHit> = sqlx::query_as(
        "SELECT cr.role_id AS id, m.full_name, m.designation, m.email, m.phone,
                cr.committee_type, cr.start_date AS date
         FROM committee_roles cr
         JOIN members m ON cr.member_id = m.member_id
         WHERE (m.full_name LIKE ? OR m.designation LIKE ?) AND cr.status = 'Active'
         ORDER BY cr.start_date DESC
         LIMIT ?",
    )
    .bind(&term)
    .bind(&term)
    .bind(PER_SOURCE_LIMIT)
    .fetch_all(pool)
    .await?;
    results.extend(committee.into_iter().map(|hit| tagged(hit, "committee")));

    Ok(results)
}

fn tagged<T: Serialize>(hit: T, kind: &str) -> Value {
    let mut value = json!(hit);
    value["type"] = json!(kind);
    value
}

#[derive(Serialize, FromRow)]
struct NewsHit {
    id: i64,
    title: String,
    content: String,
    date: OffsetDateTime,
}

#[derive(Serialize, FromRow)]
struct EventHit {
    id: i64,
    title: String,
    content: String,
    date: Option<OffsetDateTime>,
}

#[derive(Serialize, FromRow)]
struct GalleryHit {
    id: i64,
    title: String,
    content: String,
    date: OffsetDateTime,
}

#[derive(Serialize, FromRow)]
struct MemberHit {
    id: i64,
    full_name: String,
    position: String,
    email: Option<String>,
    phone: String,
    date: Date,
}

#[derive(Serialize, FromRow)]
struct CommitteeHit {
    id: i64,
    full_name: String,
    designation: String,
    email: Option<String>,
    phone: String,
    committee_type: String,
    date: Option<Date>,
}
