//! Bearer-token authentication against the sessions table.
//!
//! A session row stores only the token, the owning user and the expiry;
//! everything else is joined from the live user and member rows here, so a
//! role change or deactivation takes effect on the very next request.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use sqlx::{FromRow, SqlitePool};

use crate::error::ApiError;
use crate::models::user::Role;
use crate::util;

/// The authenticated caller, as re-derived from the live user row.
#[derive(Debug, Clone, FromRow)]
pub struct SessionUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub member_id: Option<i64>,
    pub full_name: Option<String>,
}

impl SessionUser {
    pub fn require_role(&self, allowed: &[Role], message: &str) -> Result<(), ApiError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(message.to_owned()))
        }
    }
}

/// Pulls the token out of the `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|token| !token.is_empty())
    } else {
        None
    }
}

/// Resolves a token to its user. Misses, expired rows, deactivated users and
/// lookup failures all come back as `None`; expired rows are not deleted,
/// they just never match.
pub async fn validate_session(token: &str, pool: &SqlitePool) -> Option<SessionUser> {
    let result = sqlx::query_as::<_, SessionUser>(
        "SELECT u.user_id, u.username, u.email, u.role, u.member_id, m.full_name
         FROM sessions s
         JOIN users u ON u.user_id = s.user_id
         LEFT JOIN members m ON m.member_id = u.member_id
         WHERE s.token = ? AND s.expires_at > ? AND u.status = 'Active'",
    )
    .bind(token)
    .bind(util::now())
    .fetch_optional(pool)
    .await;

    match result {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("session lookup failed: {err}");
            None
        }
    }
}

pub async fn require_session(
    headers: &HeaderMap,
    pool: &SqlitePool,
) -> Result<SessionUser, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
    validate_session(token, pool)
        .await
        .ok_or(ApiError::Unauthorized)
}

/// The caller address recorded in activity logs and applications. The
/// service sits behind a proxy, so the forwarded header is the only source.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_tokens() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);

        headers.remove(AUTHORIZATION);
        assert_eq!(bearer_token(&headers), None);
    }
}
