//! Small helpers shared across the API: timestamps, user-supplied date
//! parsing, and input validation.

use std::sync::OnceLock;

use regex::Regex;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::ApiError;

const SQL_DATETIME: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const ISO_DATETIME: &[FormatItem] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATE_FORMAT: &[FormatItem] = format_description!("[year]-[month]-[day]");

/// The current UTC time, truncated to whole seconds.
///
/// Every timestamp the application stores goes through here; sub-second
/// precision is dropped so stored values all share one encoding.
pub fn now() -> OffsetDateTime {
    let current = OffsetDateTime::now_utc();
    current.replace_nanosecond(0).unwrap_or(current)
}

pub fn today() -> Date {
    now().date()
}

/// Parses a client-supplied datetime, accepting RFC 3339 as well as the
/// `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS` forms the admin dashboard
/// sends. A bare date is taken as midnight UTC.
pub fn parse_datetime(value: &str) -> Result<OffsetDateTime, ApiError> {
    let value = value.trim();

    if let Ok(parsed) =
        OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
    {
        return Ok(parsed);
    }
    for format in [SQL_DATETIME, ISO_DATETIME] {
        if let Ok(parsed) = PrimitiveDateTime::parse(value, format) {
            return Ok(parsed.assume_utc());
        }
    }
    if let Ok(parsed) = Date::parse(value, DATE_FORMAT) {
        return Ok(parsed.midnight().assume_utc());
    }

    Err(ApiError::BadRequest(format!("Invalid datetime: {}", value)))
}

pub fn parse_date(value: &str) -> Result<Date, ApiError> {
    Date::parse(value.trim(), DATE_FORMAT)
        .map_err(|_| ApiError::BadRequest(format!("Invalid date: {}", value)))
}

pub fn valid_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
        .is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn accepts_common_datetime_forms() {
        assert_eq!(
            parse_datetime("2025-06-01 18:30:00").unwrap(),
            datetime!(2025-06-01 18:30:00 UTC)
        );
        assert_eq!(
            parse_datetime("2025-06-01T18:30:00").unwrap(),
            datetime!(2025-06-01 18:30:00 UTC)
        );
        assert_eq!(
            parse_datetime("2025-06-01").unwrap(),
            datetime!(2025-06-01 00:00:00 UTC)
        );
        assert!(parse_datetime("June 1st").is_err());
    }

    #[test]
    fn email_validation() {
        assert!(valid_email("someone@example.org"));
        assert!(!valid_email("someone@"));
        assert!(!valid_email("not an email"));
    }
}
