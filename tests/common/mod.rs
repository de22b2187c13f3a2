use std::env;

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use activity_board_backend::utils::jwt;

/// Connects to the contract-test database, or returns `None` (and skips the
/// calling test) when `TEST_DATABASE_URL` is not configured.
pub async fn setup_test_db() -> Option<PgPool> {
    let database_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };
    env::set_var("JWT_SECRET", "integration-test-secret");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Inserts a user with the given role and returns its id plus a bearer token.
pub async fn create_test_user(pool: &PgPool, role: &str) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    let username = format!("test_{}", user_id.simple());

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(&username)
    .bind(format!("{}@example.test", username))
    .bind("$2b$10$dummy.hash.for.testing")
    .bind(role)
    .execute(pool)
    .await
    .expect("Failed to create test user");

    let token = jwt::generate_token(user_id, &username, role).expect("Failed to generate token");
    (user_id, token)
}

/// Inserts an open activity. The far-future start date keeps it at the top
/// of the default listing, which orders by start date descending.
pub async fn create_test_activity(
    pool: &PgPool,
    created_by: Uuid,
    max_participants: Option<i32>,
    approval_status: &str,
) -> Uuid {
    let activity_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO activities (id, title, description, start_date, end_date,
            max_participants, status, approval_status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, 'open', $7, $8)",
    )
    .bind(activity_id)
    .bind(format!("Test activity {}", activity_id.simple()))
    .bind("Contract-test activity")
    .bind(Utc::now() + Duration::days(999))
    .bind(Utc::now() + Duration::days(1000))
    .bind(max_participants)
    .bind(approval_status)
    .bind(created_by)
    .execute(pool)
    .await
    .expect("Failed to create test activity");

    activity_id
}

/// Inserts an event that is currently running, so check-ins are valid.
pub async fn create_test_event(pool: &PgPool, activity_id: Uuid) -> Uuid {
    let event_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO activity_events (id, activity_id, title, start_date, end_date, check_in_code)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(event_id)
    .bind(activity_id)
    .bind("Test session")
    .bind(Utc::now() - Duration::hours(1))
    .bind(Utc::now() + Duration::hours(1))
    .bind("testcode12")
    .execute(pool)
    .await
    .expect("Failed to create test event");

    event_id
}
