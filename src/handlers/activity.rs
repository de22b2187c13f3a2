use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::activity::{
    approval, status, Activity, ActivityItem, ActivityWithCreator, CreatorInfo,
};
use crate::models::registration::RegistrationSummary;
use crate::models::user::AuthUser;
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::validation::{
    parse_datetime, validate_activity_status, validate_payload, validate_url,
};

const ACTIVITY_WITH_CREATOR: &str =
    "SELECT a.*, u.username AS creator_username, u.first_name AS creator_first_name,
            u.last_name AS creator_last_name
     FROM activities a JOIN users u ON u.id = a.created_by
     WHERE 1=1";

#[derive(Deserialize)]
pub struct ActivityListQuery {
    status: Option<String>,
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCreateRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    title: String,

    description: Option<String>,

    #[validate(length(max = 50, message = "Activity type must not exceed 50 characters"))]
    activity_type: Option<String>,

    #[validate(length(max = 255, message = "Faculty must not exceed 255 characters"))]
    faculty: Option<String>,

    #[validate(length(max = 255, message = "Location must not exceed 255 characters"))]
    location: Option<String>,

    start_date: Option<String>,
    end_date: Option<String>,

    #[validate(range(min = 1, message = "Max participants must be a positive integer"))]
    max_participants: Option<i32>,

    #[validate(url(message = "Invalid image URL"))]
    image_url: Option<String>,

    #[validate(url(message = "Invalid poster URL"))]
    poster_url: Option<String>,

    is_announcement_only: Option<bool>,
    registration_start_date: Option<String>,
    registration_end_date: Option<String>,

    external_link: Option<String>,

    status: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdateRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    title: Option<String>,

    description: Option<String>,

    #[validate(length(max = 50, message = "Activity type must not exceed 50 characters"))]
    activity_type: Option<String>,

    #[validate(length(max = 255, message = "Faculty must not exceed 255 characters"))]
    faculty: Option<String>,

    #[validate(length(max = 255, message = "Location must not exceed 255 characters"))]
    location: Option<String>,

    start_date: Option<String>,
    end_date: Option<String>,

    #[validate(range(min = 1, message = "Max participants must be a positive integer"))]
    max_participants: Option<i32>,

    #[validate(url(message = "Invalid image URL"))]
    image_url: Option<String>,

    #[validate(url(message = "Invalid poster URL"))]
    poster_url: Option<String>,

    is_announcement_only: Option<bool>,
    registration_start_date: Option<String>,
    registration_end_date: Option<String>,

    external_link: Option<String>,

    status: Option<String>,
}

#[derive(Serialize)]
struct ActivityDetail {
    #[serde(flatten)]
    activity: Activity,
    created_by_user: CreatorInfo,
    registrations: Vec<RegistrationSummary>,
}

/// Appends status, search and approval-visibility filters shared by the
/// listing and its count query. Students and anonymous callers only see
/// approved activities; organizers additionally see their own.
fn push_filters(
    builder: &mut QueryBuilder<Postgres>,
    query: &ActivityListQuery,
    viewer: Option<&AuthUser>,
) {
    match &query.status {
        Some(value) => {
            builder.push(" AND a.status = ").push_bind(value.clone());
        }
        None => {
            builder.push(" AND a.status <> ").push_bind(status::CANCELLED);
        }
    }

    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (a.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    match viewer {
        Some(user) if user.is_admin() => {}
        Some(user) if user.is_organizer() => {
            builder
                .push(" AND (a.approval_status = ")
                .push_bind(approval::APPROVED)
                .push(" OR a.created_by = ")
                .push_bind(user.id)
                .push(")");
        }
        _ => {
            builder
                .push(" AND a.approval_status = ")
                .push_bind(approval::APPROVED);
        }
    }
}

// GET /api/activities
pub async fn list_activities(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    query: web::Query<ActivityListQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(value) = &query.status {
        validate_activity_status(value)?;
    }

    let viewer = jwt::try_authenticate(&req, &pool).await;
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM activities a WHERE 1=1");
    push_filters(&mut count_builder, &query, viewer.as_ref());
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    let mut builder = QueryBuilder::new(ACTIVITY_WITH_CREATOR);
    push_filters(&mut builder, &query, viewer.as_ref());
    builder
        .push(" ORDER BY a.start_date DESC NULLS LAST LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let activities: Vec<ActivityItem> = builder
        .build_query_as::<ActivityWithCreator>()
        .fetch_all(&**pool)
        .await
        .map_err(AppError::db)?
        .into_iter()
        .map(ActivityItem::from)
        .collect();

    Ok(response::ok(
        json!({
            "activities": activities,
            "total": total,
            "limit": limit,
            "offset": offset,
        }),
        "Activities retrieved successfully",
    ))
}

// GET /api/activities/:id
pub async fn get_activity(
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let row = sqlx::query_as::<_, ActivityWithCreator>(&format!(
        "{} AND a.id = $1",
        ACTIVITY_WITH_CREATOR
    ))
    .bind(*activity_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    let registrations = sqlx::query_as::<_, RegistrationSummary>(
        "SELECT id, user_id, registration_status FROM registrations WHERE activity_id = $1",
    )
    .bind(*activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let item = ActivityItem::from(row);
    let detail = ActivityDetail {
        activity: item.activity,
        created_by_user: item.created_by_user,
        registrations,
    };

    Ok(response::ok(
        json!({ "activity": detail }),
        "Activity retrieved successfully",
    ))
}

// POST /api/activities
pub async fn create_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<ActivityCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::authenticate(&req, &pool).await?;
    if !user.is_admin() && !user.is_organizer() {
        return Err(AppError::Forbidden(
            "Access denied. Admin or organizer role required.".to_string(),
        ));
    }

    validate_payload(&*payload)?;
    if let Some(link) = &payload.external_link {
        validate_url(link)?;
    }

    let activity_status = match &payload.status {
        Some(value) => {
            validate_activity_status(value)?;
            value.clone()
        }
        None => status::OPEN.to_string(),
    };

    let start_date = parse_opt(&payload.start_date)?;
    let end_date = parse_opt(&payload.end_date)?;
    let registration_start_date = parse_opt(&payload.registration_start_date)?;
    let registration_end_date = parse_opt(&payload.registration_end_date)?;

    let activity = sqlx::query_as::<_, Activity>(
        "INSERT INTO activities (id, title, description, activity_type, faculty, location,
            start_date, end_date, max_participants, image_url, poster_url,
            is_announcement_only, registration_start_date, registration_end_date,
            external_link, status, approval_status, created_by)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.activity_type)
    .bind(&payload.faculty)
    .bind(&payload.location)
    .bind(start_date)
    .bind(end_date)
    .bind(payload.max_participants)
    .bind(&payload.image_url)
    .bind(&payload.poster_url)
    .bind(payload.is_announcement_only.unwrap_or(false))
    .bind(registration_start_date)
    .bind(registration_end_date)
    .bind(&payload.external_link)
    .bind(&activity_status)
    .bind(approval::PENDING)
    .bind(user.id)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::created(
        json!({ "activity": activity }),
        "Activity created successfully",
    ))
}

// PUT /api/activities/:id
pub async fn update_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
    payload: web::Json<ActivityUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::authenticate(&req, &pool).await?;
    if !user.is_admin() && !user.is_organizer() {
        return Err(AppError::Forbidden(
            "Access denied. Admin or organizer role required.".to_string(),
        ));
    }

    validate_payload(&*payload)?;
    if let Some(link) = &payload.external_link {
        validate_url(link)?;
    }

    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT created_by FROM activities WHERE id = $1")
        .bind(*activity_id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;
    let (owner,) = owner.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if !user.can_manage(owner) {
        return Err(AppError::Forbidden(
            "You can only update your own activities".to_string(),
        ));
    }

    if let Some(value) = &payload.status {
        validate_activity_status(value)?;
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE activities SET updated_at = NOW()");
    if let Some(title) = &payload.title {
        builder.push(", title = ").push_bind(title.clone());
    }
    if let Some(description) = &payload.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(activity_type) = &payload.activity_type {
        builder.push(", activity_type = ").push_bind(activity_type.clone());
    }
    if let Some(faculty) = &payload.faculty {
        builder.push(", faculty = ").push_bind(faculty.clone());
    }
    if let Some(location) = &payload.location {
        builder.push(", location = ").push_bind(location.clone());
    }
    if let Some(start_date) = &payload.start_date {
        builder.push(", start_date = ").push_bind(parse_datetime(start_date)?);
    }
    if let Some(end_date) = &payload.end_date {
        builder.push(", end_date = ").push_bind(parse_datetime(end_date)?);
    }
    if let Some(max_participants) = payload.max_participants {
        builder.push(", max_participants = ").push_bind(max_participants);
    }
    if let Some(image_url) = &payload.image_url {
        builder.push(", image_url = ").push_bind(image_url.clone());
    }
    if let Some(poster_url) = &payload.poster_url {
        builder.push(", poster_url = ").push_bind(poster_url.clone());
    }
    if let Some(flag) = payload.is_announcement_only {
        builder.push(", is_announcement_only = ").push_bind(flag);
    }
    if let Some(value) = &payload.registration_start_date {
        builder
            .push(", registration_start_date = ")
            .push_bind(parse_datetime(value)?);
    }
    if let Some(value) = &payload.registration_end_date {
        builder
            .push(", registration_end_date = ")
            .push_bind(parse_datetime(value)?);
    }
    if let Some(external_link) = &payload.external_link {
        builder.push(", external_link = ").push_bind(external_link.clone());
    }
    if let Some(value) = &payload.status {
        builder.push(", status = ").push_bind(value.clone());
    }
    builder
        .push(" WHERE id = ")
        .push_bind(*activity_id)
        .push(" RETURNING *");

    let activity = builder
        .build_query_as::<Activity>()
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "activity": activity }),
        "Activity updated successfully",
    ))
}

// DELETE /api/activities/:id
pub async fn delete_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::authenticate(&req, &pool).await?;
    if !user.is_admin() && !user.is_organizer() {
        return Err(AppError::Forbidden(
            "Access denied. Admin or organizer role required.".to_string(),
        ));
    }

    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT created_by FROM activities WHERE id = $1")
        .bind(*activity_id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;
    let (owner,) = owner.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if !user.can_manage(owner) {
        return Err(AppError::Forbidden(
            "You can only delete your own activities".to_string(),
        ));
    }

    sqlx::query("DELETE FROM activities WHERE id = $1")
        .bind(*activity_id)
        .execute(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok_empty("Activity deleted successfully"))
}

fn parse_opt(value: &Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.as_deref().map(parse_datetime).transpose()
}
