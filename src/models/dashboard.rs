use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::activity::ActivityLog;
use crate::models::event::Event;

/// The landing-page aggregate: headline counts, the latest audit entries and
/// the next few events. A freshly-migrated empty database yields the
/// all-zero shape.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_members: i64,
    pub total_events: i64,
    pub total_notices: i64,
    pub recent_activities: Vec<ActivityLog>,
    pub upcoming_events: Vec<Event>,
}

impl DashboardStats {
    pub async fn load(pool: &SqlitePool) -> sqlx::Result<Self> {
        let total_members =
            sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE status = 'Active'")
                .fetch_one(pool)
                .await?;
        let total_events = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(pool)
            .await?;
        let total_notices =
            sqlx::query_scalar("SELECT COUNT(*) FROM notices WHERE status = 'Published'")
                .fetch_one(pool)
                .await?;

        let recent_activities = ActivityLog::recent(10, pool).await?;
        let upcoming_events = Event::upcoming(5, pool).await?;

        Ok(DashboardStats {
            total_members,
            total_events,
            total_notices,
            recent_activities,
            upcoming_events,
        })
    }
}
