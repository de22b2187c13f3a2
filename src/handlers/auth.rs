use actix_web::rt::task::spawn_blocking;
use actix_web::{web, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use lazy_static::lazy_static;
use moka::sync::Cache;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::user::{roles, PublicUser, User, PUBLIC_USER_COLUMNS};
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::validation::validate_payload;

lazy_static! {
    // Keeps the register hot path from re-querying identifiers that are
    // already known to be taken.
    static ref TAKEN_IDENTIFIERS: Cache<String, bool> = Cache::new(10_000);
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    username: String,

    #[validate(email(message = "Invalid email format"))]
    email: String,

    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    password: String,

    #[validate(length(max = 100, message = "First name must not exceed 100 characters"))]
    first_name: Option<String>,

    #[validate(length(max = 100, message = "Last name must not exceed 100 characters"))]
    last_name: Option<String>,

    #[validate(length(max = 20, message = "Phone must not exceed 20 characters"))]
    phone: Option<String>,

    #[validate(length(max = 20, message = "Student ID must not exceed 20 characters"))]
    student_id: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

// POST /api/auth/register
pub async fn register(
    pool: web::Data<PgPool>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*payload)?;

    let username_key = format!("username:{}", payload.username);
    let email_key = format!("email:{}", payload.email);
    if TAKEN_IDENTIFIERS.get(&username_key).is_some()
        || TAKEN_IDENTIFIERS.get(&email_key).is_some()
    {
        return Err(AppError::BadRequest(
            "Username or email already exists".to_string(),
        ));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(&payload.username)
            .bind(&payload.email)
            .fetch_optional(&**pool)
            .await
            .map_err(AppError::db)?;

    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Username or email already exists".to_string(),
        ));
    }

    let password = payload.password.clone();
    let password_hash = spawn_blocking(move || hash(&password, 10))
        .await
        .map_err(|_| AppError::InternalServerError("Hashing failed".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let user_id = spawn_blocking(Uuid::now_v7)
        .await
        .map_err(|_| AppError::InternalServerError("UUID generation failed".to_string()))?;

    // ON CONFLICT covers the window between the existence check and insert.
    let user = sqlx::query_as::<_, PublicUser>(&format!(
        "INSERT INTO users (id, username, email, password_hash, first_name, last_name, phone, student_id, role)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT DO NOTHING
         RETURNING {}",
        PUBLIC_USER_COLUMNS
    ))
    .bind(user_id)
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.phone)
    .bind(&payload.student_id)
    .bind(roles::STUDENT)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::Conflict("Username or email already exists".to_string()))?;

    TAKEN_IDENTIFIERS.insert(username_key, true);
    TAKEN_IDENTIFIERS.insert(email_key, true);

    let token = jwt::generate_token(user.id, &user.username, &user.role)?;

    Ok(response::created(
        json!({ "user": user, "token": token }),
        "Registration successful",
    ))
}

// POST /api/auth/login
pub async fn login(
    pool: web::Data<PgPool>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&*payload)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".to_string()))?;

    let password = payload.password.clone();
    let password_hash = user.password_hash.clone();
    let is_valid = spawn_blocking(move || verify(password.as_str(), &password_hash))
        .await
        .map_err(|_| AppError::InternalServerError("Password verification error".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if !is_valid {
        return Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = jwt::generate_token(user.id, &user.username, &user.role)?;
    let user = PublicUser::from(user);

    Ok(response::ok(
        json!({ "user": user, "token": token }),
        "Login successful",
    ))
}

// GET /api/auth/me
pub async fn me(req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    Ok(response::ok(
        json!({ "user": user }),
        "User retrieved successfully",
    ))
}

// POST /api/auth/logout
pub async fn logout() -> Result<HttpResponse, AppError> {
    // Token invalidation is client-side; the server keeps no session state.
    Ok(response::ok_empty("Logout successful"))
}
