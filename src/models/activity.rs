use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod status {
    pub const OPEN: &str = "open";
    pub const CLOSED: &str = "closed";
    pub const CANCELLED: &str = "cancelled";
    pub const COMPLETED: &str = "completed";
    pub const ALL: [&str; 4] = [OPEN, CLOSED, CANCELLED, COMPLETED];
}

pub mod approval {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Activity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub activity_type: Option<String>,
    pub faculty: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
    pub current_participants: i32,
    pub image_url: Option<String>,
    pub poster_url: Option<String>,
    pub is_announcement_only: bool,
    pub registration_start_date: Option<DateTime<Utc>>,
    pub registration_end_date: Option<DateTime<Utc>>,
    pub external_link: Option<String>,
    pub status: String,
    pub approval_status: String,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Activity joined with its creator, for listings.
#[derive(sqlx::FromRow, Debug)]
pub struct ActivityWithCreator {
    #[sqlx(flatten)]
    pub activity: Activity,
    pub creator_username: String,
    pub creator_first_name: Option<String>,
    pub creator_last_name: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct CreatorInfo {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ActivityItem {
    #[serde(flatten)]
    pub activity: Activity,
    pub created_by_user: CreatorInfo,
}

impl From<ActivityWithCreator> for ActivityItem {
    fn from(row: ActivityWithCreator) -> Self {
        let created_by_user = CreatorInfo {
            id: row.activity.created_by,
            username: row.creator_username,
            first_name: row.creator_first_name,
            last_name: row.creator_last_name,
        };
        ActivityItem {
            activity: row.activity,
            created_by_user,
        }
    }
}
