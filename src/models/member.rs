use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool};
use time::Date;

#[derive(Debug, Serialize, FromRow)]
pub struct Member {
    pub member_id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub membership_type: String,
    pub profile_image: Option<String>,
    pub joined_date: Date,
    pub status: String,
}

pub struct NewMember {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub membership_type: String,
    pub profile_image: Option<String>,
    pub joined_date: Date,
    pub status: String,
}

impl Member {
    pub async fn active(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT * FROM members WHERE status = 'Active' ORDER BY joined_date DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn with_id(member_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM members WHERE member_id = ?")
            .bind(member_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(new: &NewMember, pool: &SqlitePool) -> sqlx::Result<Self> {
        let member_id = Self::insert(new, pool).await?;
        Self::with_id(member_id, pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Bare insert, usable inside a larger transaction.
    pub async fn insert<'e, E>(new: &NewMember, executor: E) -> sqlx::Result<i64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        // An absent email is stored as NULL so the unique index doesn't
        // trip over repeated empty strings.
        let email = new.email.as_deref().filter(|email| !email.is_empty());

        let result = sqlx::query(
            "INSERT INTO members
             (full_name, email, phone, address, designation, membership_type,
              profile_image, joined_date, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.full_name)
        .bind(email)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(&new.designation)
        .bind(&new.membership_type)
        .bind(&new.profile_image)
        .bind(new.joined_date)
        .bind(&new.status)
        .execute(executor)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
