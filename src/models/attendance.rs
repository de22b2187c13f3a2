use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod status {
    pub const PRESENT: &str = "present";
    pub const ABSENT: &str = "absent";
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub event_id: Uuid,
    pub status: String,
    pub check_in_time: DateTime<Utc>,
}
