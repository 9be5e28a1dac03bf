use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::{Date, OffsetDateTime};

use crate::util;

/// Prefix on generated membership codes, followed by the two-digit year and
/// four random digits.
const MEMBER_CODE_PREFIX: &str = "MBR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Verified,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Verified => "verified",
            ApplicationStatus::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MembershipApplication {
    pub application_id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub membership_type: String,
    pub university: String,
    pub visa_type: Option<String>,
    pub other_visa: String,
    pub arrival_date: Option<Date>,
    pub transaction_id: String,
    pub payment_screenshot: String,
    pub interests: String,
    pub notes: String,
    pub application_date: OffsetDateTime,
    pub status: ApplicationStatus,
    pub member_code: String,
    pub ip_address: String,
    pub rejection_reason: Option<String>,
    pub verified_date: Option<OffsetDateTime>,
    pub rejected_date: Option<OffsetDateTime>,
}

#[derive(Debug, Default)]
pub struct NewApplication {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub membership_type: String,
    pub university: String,
    pub visa_type: Option<String>,
    pub other_visa: String,
    pub arrival_date: Option<Date>,
    pub transaction_id: String,
    pub payment_screenshot: String,
    pub interests: String,
    pub notes: String,
    pub ip_address: String,
}

impl MembershipApplication {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as("SELECT * FROM membership_applications ORDER BY application_date DESC")
            .fetch_all(pool)
            .await
    }

    pub async fn with_id(application_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM membership_applications WHERE application_id = ?")
            .bind(application_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(new: &NewApplication, pool: &SqlitePool) -> sqlx::Result<Self> {
        let member_code = Self::generate_member_code();

        let result = sqlx::query(
            "INSERT INTO membership_applications
             (full_name, email, phone, address, designation, membership_type, university,
              visa_type, other_visa, arrival_date, transaction_id, payment_screenshot,
              interests, notes, application_date, status, member_code, ip_address)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&new.full_name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.designation)
        .bind(&new.membership_type)
        .bind(&new.university)
        .bind(&new.visa_type)
        .bind(&new.other_visa)
        .bind(new.arrival_date)
        .bind(&new.transaction_id)
        .bind(&new.payment_screenshot)
        .bind(&new.interests)
        .bind(&new.notes)
        .bind(util::now())
        .bind(&member_code)
        .bind(&new.ip_address)
        .execute(pool)
        .await?;

        Self::with_id(result.last_insert_rowid(), pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Moves an application through its review workflow, stamping the
    /// transition timestamp and keeping absent fields unchanged.
    pub async fn update_status(
        application_id: i64,
        status: ApplicationStatus,
        notes: Option<&str>,
        rejection_reason: Option<&str>,
        pool: &SqlitePool,
    ) -> sqlx::Result<Option<Self>> {
        let query = match status {
            ApplicationStatus::Verified => {
                "UPDATE membership_applications
                 SET status = ?, notes = COALESCE(?, notes),
                     rejection_reason = COALESCE(?, rejection_reason), verified_date = ?
                 WHERE application_id = ?"
            }
            ApplicationStatus::Rejected => {
                "UPDATE membership_applications
                 SET status = ?, notes = COALESCE(?, notes),
                     rejection_reason = COALESCE(?, rejection_reason), rejected_date = ?
                 WHERE application_id = ?"
            }
            ApplicationStatus::Pending => {
                "UPDATE membership_applications
                 SET status = ?, notes = COALESCE(?, notes),
                     rejection_reason = COALESCE(?, rejection_reason)
                 WHERE application_id = ?"
            }
        };

        let mut statement = sqlx::query(query)
            .bind(status)
            .bind(notes)
            .bind(rejection_reason);
        if status != ApplicationStatus::Pending {
            statement = statement.bind(util::now());
        }
        let result = statement.bind(application_id).execute(pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::with_id(application_id, pool).await
    }

    pub fn generate_member_code() -> String {
        let year = util::today().year() % 100;
        let digits = rand::thread_rng().gen_range(1..=9999);
        format!("{}{:02}{:04}", MEMBER_CODE_PREFIX, year, digits)
    }
}
