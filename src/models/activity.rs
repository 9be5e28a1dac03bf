use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::util;

/// A human-readable audit trail entry. Rows outlive their user (the FK nulls
/// out on delete) and anonymous actions carry no user at all.
#[derive(Debug, Serialize, FromRow)]
pub struct ActivityLog {
    pub log_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub timestamp: OffsetDateTime,
    pub ip_address: String,
}

impl ActivityLog {
    /// Best-effort: a failure to write the audit row must never fail the
    /// request that triggered it.
    pub async fn record(pool: &SqlitePool, user_id: Option<i64>, action: &str, ip_address: &str) {
        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, action, timestamp, ip_address)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(util::now())
        .bind(ip_address)
        .execute(pool)
        .await;

        if let Err(err) = result {
            tracing::warn!("failed to record activity {action:?}: {err}");
        }
    }

    pub async fn list(
        user_id: Option<i64>,
        limit: i64,
        offset: i64,
        pool: &SqlitePool,
    ) -> sqlx::Result<Vec<Self>> {
        const LOG_SELECT: &str =
            "SELECT a.log_id, a.user_id, u.username, a.action, a.timestamp, a.ip_address
             FROM activity_logs a
             LEFT JOIN users u ON a.user_id = u.user_id";

        let rows = match user_id {
            Some(user_id) => {
                sqlx::query_as(&format!(
                    "{LOG_SELECT}
                     WHERE a.user_id = ?
                     ORDER BY a.timestamp DESC, a.log_id DESC
                     LIMIT ? OFFSET ?"
                ))
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "{LOG_SELECT}
                     ORDER BY a.timestamp DESC, a.log_id DESC
                     LIMIT ? OFFSET ?"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows)
    }

    pub async fn recent(limit: i64, pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        Self::list(None, limit, 0, pool).await
    }
}
