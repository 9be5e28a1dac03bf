use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

/// Attendance is a bare counter; RSVPs are anonymous and never capped.
const DEFAULT_MAX_PARTICIPANTS: i64 = 100;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub event_id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub organized_by: Option<i64>,
    pub organized_by_name: Option<String>,
    pub status: EventStatus,
    pub rsvp_count: i64,
}

const EVENT_SELECT: &str =
    "SELECT e.event_id, e.title, e.description, e.location, e.start_date, e.end_date,
            e.organized_by, m.full_name AS organized_by_name, e.status, e.rsvp_count
     FROM events e
     LEFT JOIN members m ON e.organized_by = m.member_id";

pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub organized_by: Option<i64>,
}

impl Event {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{EVENT_SELECT} ORDER BY e.start_date DESC"))
            .fetch_all(pool)
            .await
    }

    pub async fn with_id(event_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{EVENT_SELECT} WHERE e.event_id = ?"))
            .bind(event_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(new: &NewEvent, pool: &SqlitePool) -> sqlx::Result<Self> {
        let result = sqlx::query(
            "INSERT INTO events (title, description, location, start_date, end_date,
                                 organized_by, status)
             VALUES (?, ?, ?, ?, ?, ?, 'Upcoming')",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.organized_by)
        .execute(pool)
        .await?;

        Self::with_id(result.last_insert_rowid(), pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(event_id: i64, pool: &SqlitePool) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE event_id = ?")
            .bind(event_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The next few events, for the dashboard.
    pub async fn upcoming(limit: i64, pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{EVENT_SELECT}
             WHERE e.start_date > ? AND e.status = 'Upcoming'
             ORDER BY e.start_date ASC
             LIMIT ?"
        ))
        .bind(util::now())
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Records an anonymous RSVP and returns the updated count, or `None`
    /// when the event doesn't exist.
    ///
    /// The activity-log insert and the counter bump commit together; a
    /// failure of either rolls both back.
    pub async fn rsvp(
        event_id: i64,
        event_title: &str,
        pool: &SqlitePool,
    ) -> sqlx::Result<Option<i64>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT event_id FROM events WHERE event_id = ?")
            .bind(event_id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO activity_logs (user_id, action, timestamp, ip_address)
             VALUES (NULL, ?, ?, 'unknown')",
        )
        .bind(format!("RSVP for event: {}", event_title))
        .bind(util::now())
        .execute(&mut tx)
        .await?;

        sqlx::query("UPDATE events SET rsvp_count = rsvp_count + 1 WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT rsvp_count FROM events WHERE event_id = ?")
            .bind(event_id)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(Some(count))
    }

    /// The listing shown on the public site, soonest first. When nothing is
    /// Upcoming or Ongoing the filter is dropped so past events still render.
    pub async fn public_list(pool: &SqlitePool) -> sqlx::Result<Vec<PublicEvent>> {
        let filtered: Vec<PublicEventRow> = sqlx::query_as(&format!(
            "{PUBLIC_EVENT_SELECT}
             WHERE e.status IN ('Upcoming', 'Ongoing')
             ORDER BY e.start_date ASC"
        ))
        .fetch_all(pool)
        .await?;

        let rows = if filtered.is_empty() {
            sqlx::query_as(&format!("{PUBLIC_EVENT_SELECT} ORDER BY e.start_date ASC"))
                .fetch_all(pool)
                .await?
        } else {
            filtered
        };

        Ok(rows.into_iter().map(PublicEvent::from).collect())
    }
}

const PUBLIC_EVENT_SELECT: &str =
    "SELECT e.event_id AS id, e.title, e.description, e.start_date AS event_date, e.location,
            e.status, e.rsvp_count AS current_participants, m.full_name AS organizer_name
     FROM events e
     LEFT JOIN members m ON e.organized_by = m.member_id";

#[derive(Debug, FromRow)]
struct PublicEventRow {
    id: i64,
    title: String,
    description: String,
    event_date: Option<OffsetDateTime>,
    location: String,
    status: EventStatus,
    current_participants: i64,
    organizer_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub event_date: Option<OffsetDateTime>,
    pub location: String,
    pub status: EventStatus,
    pub organizer_name: Option<String>,
    pub committee_role: String,
    pub max_participants: i64,
    pub current_participants: i64,
    pub spots_available: i64,
}

impl From<PublicEventRow> for PublicEvent {
    fn from(row: PublicEventRow) -> Self {
        let committee_role = row
            .organizer_name
            .clone()
            .unwrap_or_else(|| "General".to_owned());

        PublicEvent {
            id: row.id,
            title: row.title,
            description: row.description,
            event_date: row.event_date,
            location: row.location,
            status: row.status,
            organizer_name: row.organizer_name,
            committee_role,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            spots_available: (DEFAULT_MAX_PARTICIPANTS - row.current_participants).max(0),
            current_participants: row.current_participants,
        }
    }
}
