use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod status {
    pub const REGISTERED: &str = "registered";
    pub const CANCELLED: &str = "cancelled";
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_id: Uuid,
    pub registration_status: String,
    pub notifications_enabled: bool,
    pub registered_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Minimal registration shape embedded in activity detail responses.
#[derive(sqlx::FromRow, Serialize, Debug)]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_status: String,
}

/// Registration joined with registrant info, for organizer views.
#[derive(sqlx::FromRow, Debug)]
pub struct RegistrationWithUser {
    #[sqlx(flatten)]
    pub registration: Registration,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub student_id: Option<String>,
}
