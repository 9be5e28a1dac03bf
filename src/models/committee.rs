use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use time::Date;

use crate::error::{ApiError, ApiResult};
use crate::models::member::{Member, NewMember};
use crate::util;

/// A governance position, joined with the member holding it.
#[derive(Debug, Serialize, FromRow)]
pub struct CommitteeRole {
    pub role_id: i64,
    pub member_id: i64,
    pub role_title: String,
    pub committee_type: String,
    pub status: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub display_order: Option<i64>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub designation: String,
    pub profile_image: Option<String>,
}

impl CommitteeRole {
    /// Active roles in display order: committee-type rank first (Founder,
    /// Executive, Associate, then anything else), then role title.
    pub async fn active(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(
            "SELECT c.role_id, c.member_id, c.role_title, c.committee_type, c.status,
                    c.start_date, c.end_date, c.display_order,
                    m.full_name, m.email, m.phone, m.designation, m.profile_image
             FROM committee_roles c
             JOIN members m ON c.member_id = m.member_id
             WHERE c.status = 'Active'
             ORDER BY
                 CASE c.committee_type
                     WHEN 'Founder' THEN 1
                     WHEN 'Executive' THEN 2
                     WHEN 'Associate' THEN 3
                     ELSE 4
                 END,
                 c.role_title",
        )
        .fetch_all(pool)
        .await
    }
}

/// A member with their committee role, as the public site lists people.
#[derive(Debug, Serialize, FromRow)]
pub struct CommitteeMember {
    pub member_id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub designation: String,
    pub membership_type: String,
    pub profile_image: Option<String>,
    pub joined_date: Date,
    pub member_status: String,
    pub committee_type: Option<String>,
    pub role_title: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub role_status: Option<String>,
    pub committee_status: String,
}

const COMMITTEE_MEMBER_SELECT: &str =
    "SELECT m.member_id, m.full_name, m.email, m.phone, m.address, m.designation,
            m.membership_type, m.profile_image, m.joined_date, m.status AS member_status,
            cr.committee_type, cr.role_title, cr.start_date, cr.end_date,
            cr.status AS role_status,
            CASE
                WHEN cr.status = 'Active' THEN 'Active'
                WHEN cr.status = 'Former' THEN 'Former'
                ELSE 'Unknown'
            END AS committee_status
     FROM members m
     LEFT JOIN committee_roles cr ON m.member_id = cr.member_id";

pub struct NewCommitteeMember {
    pub name: String,
    pub position: String,
    pub committee_type: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub membership_type: String,
    pub profile_image: Option<String>,
    pub joined_date: Date,
    pub status: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitteeMemberUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub designation: Option<String>,
    pub membership_type: Option<String>,
    pub status: Option<String>,
    pub position: Option<String>,
}

impl CommitteeMember {
    pub async fn all(pool: &SqlitePool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as(&format!(
            "{COMMITTEE_MEMBER_SELECT} ORDER BY cr.display_order, m.full_name"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn with_member_id(member_id: i64, pool: &SqlitePool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as(&format!(
            "{COMMITTEE_MEMBER_SELECT} WHERE m.member_id = ? AND cr.status = 'Active'"
        ))
        .bind(member_id)
        .fetch_optional(pool)
        .await
    }

    /// Creates the member record and its committee role together; neither
    /// row survives without the other.
    pub async fn create(new: &NewCommitteeMember, pool: &SqlitePool) -> sqlx::Result<i64> {
        let mut tx = pool.begin().await?;

        let member = NewMember {
            full_name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            address: new.address.clone(),
            designation: new.position.clone(),
            membership_type: new.membership_type.clone(),
            profile_image: new.profile_image.clone(),
            joined_date: new.joined_date,
            status: new.status.clone(),
        };
        let member_id = Member::insert(&member, &mut tx).await?;

        sqlx::query(
            "INSERT INTO committee_roles
             (member_id, role_title, committee_type, start_date, end_date, status)
             VALUES (?, ?, ?, ?, ?, 'Active')",
        )
        .bind(member_id)
        .bind(&new.position)
        .bind(&new.committee_type)
        .bind(new.start_date)
        .bind(new.end_date)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(member_id)
    }

    /// Partial member update over the allow-listed fields, cascading a new
    /// `position` to the committee role. Returns the affected row count of
    /// the last statement run.
    pub async fn update(
        member_id: i64,
        update: &CommitteeMemberUpdate,
        pool: &SqlitePool,
    ) -> ApiResult<u64> {
        let mut fields: Vec<(&str, &String)> = Vec::new();
        if let Some(full_name) = &update.full_name {
            fields.push(("full_name", full_name));
        }
        if let Some(email) = &update.email {
            fields.push(("email", email));
        }
        if let Some(phone) = &update.phone {
            fields.push(("phone", phone));
        }
        if let Some(address) = &update.address {
            fields.push(("address", address));
        }
        if let Some(designation) = &update.designation {
            fields.push(("designation", designation));
        }
        if let Some(membership_type) = &update.membership_type {
            fields.push(("membership_type", membership_type));
        }
        if let Some(status) = &update.status {
            fields.push(("status", status));
        }

        if fields.is_empty() {
            return Err(ApiError::BadRequest("No valid fields to update".to_owned()));
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE members SET ");
        let mut separated = builder.separated(", ");
        for (column, value) in fields {
            separated.push(format!("{column} = "));
            separated.push_bind_unseparated(value);
        }
        builder.push(" WHERE member_id = ");
        builder.push_bind(member_id);

        let mut affected = builder.build().execute(pool).await?.rows_affected();

        if let Some(position) = &update.position {
            affected = sqlx::query(
                "UPDATE committee_roles SET role_title = ? WHERE member_id = ?",
            )
            .bind(position)
            .bind(member_id)
            .execute(pool)
            .await?
            .rows_affected();
        }

        Ok(affected)
    }

    /// Soft delete: the member goes Inactive and the role goes Former.
    pub async fn deactivate(member_id: i64, pool: &SqlitePool) -> sqlx::Result<u64> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE members SET status = 'Inactive' WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut tx)
            .await?;
        let result = sqlx::query("UPDATE committee_roles SET status = 'Former' WHERE member_id = ?")
            .bind(member_id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

impl NewCommitteeMember {
    pub fn defaults(name: String, position: String, committee_type: String) -> Self {
        NewCommitteeMember {
            name,
            position,
            committee_type,
            email: None,
            phone: String::new(),
            address: String::new(),
            membership_type: "General".to_owned(),
            profile_image: None,
            joined_date: util::today(),
            status: "Active".to_owned(),
            start_date: util::today(),
            end_date: None,
        }
    }
}
