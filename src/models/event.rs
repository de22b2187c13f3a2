use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A scheduled sub-event of an activity. The check-in code is embedded in
/// the QR an organizer displays and is never serialized to participants.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub check_in_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event joined with the owning activity's creator, for permission checks.
#[derive(sqlx::FromRow, Debug)]
pub struct EventWithOwner {
    #[sqlx(flatten)]
    pub event: ActivityEvent,
    pub owner_id: Uuid,
}
