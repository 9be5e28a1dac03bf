use rand::RngCore;
use sqlx::{FromRow, SqlitePool};
use time::{Duration, OffsetDateTime};

use crate::util;

/// A login session. The row holds only the token, the owning user and the
/// expiry; everything shown about the user is re-read from the live user and
/// member rows on each request.
#[derive(Debug, FromRow)]
pub struct Session {
    pub session_id: i64,
    pub token: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// 32 random bytes, hex encoded.
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    pub async fn create(user_id: i64, ttl_hours: i64, pool: &SqlitePool) -> sqlx::Result<Self> {
        let token = Self::generate_token();
        let created_at = util::now();
        let expires_at = created_at + Duration::hours(ttl_hours);

        let result = sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(created_at)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(Session {
            session_id: result.last_insert_rowid(),
            token,
            user_id,
            created_at,
            expires_at,
        })
    }

    pub async fn with_token(token: &str, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Expired rows are left in place; they simply stop matching lookups.
    pub async fn delete_by_token(token: &str, pool: &SqlitePool) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let first = Session::generate_token();
        let second = Session::generate_token();

        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }
}
