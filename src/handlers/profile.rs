use actix_multipart::Multipart;
use actix_web::rt::task::spawn_blocking;
use actix_web::{web, HttpRequest, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bcrypt::{hash, verify};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::user::{PublicUser, PUBLIC_USER_COLUMNS};
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::validation::validate_payload;

const MAX_AVATAR_BYTES: usize = 1_048_576;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    #[validate(length(max = 100, message = "First name must not exceed 100 characters"))]
    first_name: Option<String>,

    #[validate(length(max = 100, message = "Last name must not exceed 100 characters"))]
    last_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    email: Option<String>,

    #[validate(length(max = 20, message = "Phone must not exceed 20 characters"))]
    phone: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    current_password: String,

    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    new_password: String,
}

#[derive(sqlx::FromRow)]
struct RegistrationCounts {
    total: i64,
    registered: i64,
    completed: i64,
    cancelled: i64,
}

// GET /api/profile
pub async fn get_profile(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let profile = sqlx::query_as::<_, PublicUser>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PUBLIC_USER_COLUMNS
    ))
    .bind(user.id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(response::ok(
        json!({ "user": profile }),
        "Profile retrieved successfully",
    ))
}

// PUT /api/profile
pub async fn update_profile(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<ProfileUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    validate_payload(&*payload)?;

    if let Some(email) = &payload.email {
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(user.id)
                .fetch_optional(&**pool)
                .await
                .map_err(AppError::db)?;
        if taken.is_some() {
            return Err(AppError::BadRequest("Email already in use".to_string()));
        }
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
    if let Some(first_name) = &payload.first_name {
        builder.push(", first_name = ").push_bind(first_name.clone());
    }
    if let Some(last_name) = &payload.last_name {
        builder.push(", last_name = ").push_bind(last_name.clone());
    }
    if let Some(email) = &payload.email {
        builder.push(", email = ").push_bind(email.clone());
    }
    if let Some(phone) = &payload.phone {
        builder.push(", phone = ").push_bind(phone.clone());
    }
    builder
        .push(" WHERE id = ")
        .push_bind(user.id)
        .push(&format!(" RETURNING {}", PUBLIC_USER_COLUMNS));

    let updated = builder
        .build_query_as::<PublicUser>()
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "user": updated }),
        "Profile updated successfully",
    ))
}

// PUT /api/profile/password
pub async fn change_password(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<PasswordChangeRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    validate_payload(&*payload)?;

    let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
        .bind(user.id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;
    let (password_hash,) = row.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let current = payload.current_password.clone();
    let is_valid = spawn_blocking(move || verify(current.as_str(), &password_hash))
        .await
        .map_err(|_| AppError::InternalServerError("Password verification error".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    if !is_valid {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_password = payload.new_password.clone();
    let new_hash = spawn_blocking(move || hash(&new_password, 10))
        .await
        .map_err(|_| AppError::InternalServerError("Hashing failed".to_string()))?
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_hash)
        .bind(user.id)
        .execute(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok_empty("Password changed successfully"))
}

// POST /api/profile/avatar
//
// Accepts a multipart `file` field, sniffs the content type and stores the
// image as a base64 data URI on the user row.
pub async fn upload_avatar(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut file_data = Vec::new();
    let mut file_size = 0;

    while let Some(item) = multipart.next().await {
        let mut field = item.map_err(|err| {
            log::error!("invalid multipart field: {:?}", err);
            AppError::BadRequest("Invalid multipart field".to_string())
        })?;

        if field.name() != "file" {
            return Err(AppError::BadRequest(
                "Invalid field name: expected 'file'".to_string(),
            ));
        }

        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|err| {
                log::error!("failed to read chunk: {:?}", err);
                AppError::BadRequest("Failed to read file".to_string())
            })?;
            file_size += chunk.len();
            if file_size > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest(
                    "File size exceeds 1MiB limit".to_string(),
                ));
            }
            file_data.extend_from_slice(&chunk);
        }
    }

    if file_data.is_empty() {
        return Err(AppError::BadRequest("No avatar data provided".to_string()));
    }

    let file_type = infer::get(&file_data)
        .ok_or_else(|| AppError::BadRequest("Unable to detect file type".to_string()))?;

    if !["image/jpeg", "image/jpg", "image/png"].contains(&file_type.mime_type()) {
        return Err(AppError::BadRequest(
            "Only JPEG and PNG files are allowed".to_string(),
        ));
    }

    let avatar_url = format!(
        "data:{};base64,{}",
        file_type.mime_type(),
        BASE64.encode(&file_data)
    );

    let updated = sqlx::query_as::<_, PublicUser>(&format!(
        "UPDATE users SET avatar_url = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        PUBLIC_USER_COLUMNS
    ))
    .bind(&avatar_url)
    .bind(user.id)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "user": updated }),
        "Avatar updated successfully",
    ))
}

// GET /api/profile/stats
pub async fn profile_stats(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let counts = sqlx::query_as::<_, RegistrationCounts>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE registration_status = 'registered') AS registered,
                COUNT(*) FILTER (WHERE registration_status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE registration_status = 'cancelled') AS cancelled
         FROM registrations WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::ok(
        json!({
            "stats": {
                "total": counts.total,
                "registered": counts.registered,
                "completed": counts.completed,
                "cancelled": counts.cancelled,
            },
        }),
        "Stats retrieved successfully",
    ))
}
