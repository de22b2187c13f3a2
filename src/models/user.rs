use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub mod roles {
    pub const STUDENT: &str = "student";
    pub const ORGANIZER: &str = "organizer";
    pub const ADMIN: &str = "admin";
    pub const ALL: [&str; 3] = [STUDENT, ORGANIZER, ADMIN];
}

/// Column list for every query that returns a user to the outside world.
pub const PUBLIC_USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, phone, student_id, role, avatar_url, created_at";

/// Full row, only fetched where the password hash is actually needed.
#[derive(sqlx::FromRow, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            student_id: user.student_id,
            role: user.role,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

/// The requesting user, loaded by the bearer middleware and attached to the
/// request extensions.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub avatar_url: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }

    pub fn is_organizer(&self) -> bool {
        self.role == roles::ORGANIZER
    }

    /// Admins manage everything, everyone else only what they created.
    pub fn can_manage(&self, owner: Uuid) -> bool {
        self.is_admin() || self.id == owner
    }
}

/// Registrant subset embedded in participant and attendance listings.
#[derive(sqlx::FromRow, Serialize, Clone, Debug)]
pub struct ParticipantInfo {
    pub id: Uuid,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub student_id: Option<String>,
}
