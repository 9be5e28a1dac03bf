use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::error::ApiResult;
use crate::models::member::{Member, NewMember};
use crate::util;

/// Dashboard access levels, stored as text on the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    #[serde(rename = "Super Admin")]
    #[sqlx(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Admin")]
    #[sqlx(rename = "Admin")]
    Admin,
    #[serde(rename = "Member")]
    #[sqlx(rename = "Member")]
    Member,
}

/// A user account as exposed to the dashboard: joined with its linked member
/// record and never carrying the password hash.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AdminUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
    pub full_name: Option<String>,
    pub member_id: Option<i64>,
}

const ADMIN_USER_SELECT: &str =
    "SELECT u.user_id, u.username, u.email, u.role, u.status, u.created_at, u.last_login,
            m.full_name, m.member_id
     FROM users u
     LEFT JOIN members m ON u.member_id = m.member_id";

/// The row needed to check a login attempt.
#[derive(Debug, FromRow)]
pub struct LoginUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub pass_hash: String,
    pub role: Role,
    pub member_id: Option<i64>,
    pub full_name: Option<String>,
}

pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub member_id: Option<i64>,
    pub full_name: Option<String>,
    pub phone: String,
    pub address: String,
    pub designation: String,
}

impl AdminUser {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!("{ADMIN_USER_SELECT} ORDER BY u.created_at DESC"))
            .fetch_all(pool)
            .await
    }

    /// The users holding a dashboard role.
    pub async fn admins(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{ADMIN_USER_SELECT}
             WHERE u.role IN ('Admin', 'Super Admin')
             ORDER BY u.created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn with_id(user_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!("{ADMIN_USER_SELECT} WHERE u.user_id = ?"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Looks up an active account for a login attempt.
    pub async fn for_login(email: &str, pool: &SqlitePool) -> sqlx::Result<Option<LoginUser>> {
        sqlx::query_as(
            "SELECT u.user_id, u.username, u.email, u.pass_hash, u.role, u.member_id, m.full_name
             FROM users u
             LEFT JOIN members m ON u.member_id = m.member_id
             WHERE u.email = ? AND u.status = 'Active'",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_last_login(user_id: i64, pool: &SqlitePool) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET last_login = ? WHERE user_id = ?")
            .bind(util::now())
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Creates an admin account, reusing an existing member record or
    /// creating one. Both writes happen in one transaction so a failure
    /// can't leave a member without its account.
    pub async fn create_admin(new: NewAdmin, pool: &SqlitePool) -> ApiResult<Self> {
        let pass_hash = bcrypt::hash(&new.password, bcrypt::DEFAULT_COST)
            .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;

        let mut tx = pool.begin().await?;

        let member_id = match new.member_id {
            Some(id) => id,
            None => {
                let member = NewMember {
                    full_name: new.full_name.clone().unwrap_or_default(),
                    email: Some(new.email.clone()),
                    phone: new.phone.clone(),
                    address: new.address.clone(),
                    designation: new.designation.clone(),
                    membership_type: "General".to_owned(),
                    profile_image: None,
                    joined_date: util::today(),
                    status: "Active".to_owned(),
                };
                Member::insert(&member, &mut tx).await?
            }
        };

        let result = sqlx::query(
            "INSERT INTO users (username, email, pass_hash, role, member_id, status, created_at)
             VALUES (?, ?, ?, ?, ?, 'Active', ?)",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&pass_hash)
        .bind(new.role)
        .bind(member_id)
        .bind(util::now())
        .execute(&mut tx)
        .await?;
        let user_id = result.last_insert_rowid();

        tx.commit().await?;

        let created = Self::with_id(user_id, pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("created user disappeared"))?;
        Ok(created)
    }
}
