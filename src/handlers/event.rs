use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::activity::Activity;
use crate::models::event::{ActivityEvent, EventWithOwner};
use crate::utils::jwt;
use crate::utils::qr;
use crate::utils::response;
use crate::utils::validation::{parse_datetime, validate_payload};

const EVENT_WITH_OWNER: &str =
    "SELECT e.*, a.created_by AS owner_id
     FROM activity_events e JOIN activities a ON a.id = e.activity_id
     WHERE e.id = $1";

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventCreateRequest {
    activity_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    title: String,

    description: Option<String>,

    #[validate(length(min = 1, message = "Start date is required"))]
    start_date: String,

    #[validate(length(min = 1, message = "End date is required"))]
    end_date: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdateRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    title: Option<String>,

    description: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Organizer-facing event shape that re-adds the hidden check-in code.
#[derive(Serialize)]
struct EventWithCode {
    #[serde(flatten)]
    event: ActivityEvent,
    check_in_code: String,
}

impl From<ActivityEvent> for EventWithCode {
    fn from(event: ActivityEvent) -> Self {
        let check_in_code = event.check_in_code.clone();
        EventWithCode {
            event,
            check_in_code,
        }
    }
}

async fn fetch_event_with_owner(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<EventWithOwner, AppError> {
    sqlx::query_as::<_, EventWithOwner>(EVENT_WITH_OWNER)
        .bind(event_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db)?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

// GET /api/events/activity/:activityId
pub async fn list_activity_events(
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let events = sqlx::query_as::<_, ActivityEvent>(
        "SELECT * FROM activity_events WHERE activity_id = $1 ORDER BY start_date ASC",
    )
    .bind(*activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "events": events }),
        "Events retrieved successfully",
    ))
}

// POST /api/events
pub async fn create_event(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<EventCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    validate_payload(&*payload)?;

    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT created_by FROM activities WHERE id = $1")
        .bind(payload.activity_id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;
    let (owner,) = owner.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if !user.can_manage(owner) {
        return Err(AppError::Forbidden(
            "Unauthorized to create events for this activity".to_string(),
        ));
    }

    let start_date = parse_datetime(&payload.start_date)?;
    let end_date = parse_datetime(&payload.end_date)?;

    let event = sqlx::query_as::<_, ActivityEvent>(
        "INSERT INTO activity_events (id, activity_id, title, description, start_date, end_date, check_in_code)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.activity_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(start_date)
    .bind(end_date)
    .bind(qr::generate_check_in_code())
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::created(
        json!({ "event": EventWithCode::from(event) }),
        "Event created successfully",
    ))
}

// GET /api/events/:id
pub async fn get_event(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    let row = fetch_event_with_owner(&pool, *event_id).await?;

    let activity = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1")
        .bind(row.event.activity_id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;

    // Only the organizer (or an admin) gets the check-in code back.
    let event = if user.can_manage(row.owner_id) {
        serde_json::to_value(EventWithCode::from(row.event))
    } else {
        serde_json::to_value(row.event)
    }
    .map_err(|_| AppError::InternalServerError("Serialization error".to_string()))?;

    Ok(response::ok(
        json!({ "event": event, "activity": activity }),
        "Event retrieved successfully",
    ))
}

// PUT /api/events/:id
pub async fn update_event(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
    payload: web::Json<EventUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    validate_payload(&*payload)?;

    let row = fetch_event_with_owner(&pool, *event_id).await?;
    if !user.can_manage(row.owner_id) {
        return Err(AppError::Forbidden(
            "Unauthorized to update this event".to_string(),
        ));
    }

    let mut builder =
        QueryBuilder::<Postgres>::new("UPDATE activity_events SET updated_at = NOW()");
    if let Some(title) = &payload.title {
        builder.push(", title = ").push_bind(title.clone());
    }
    if let Some(description) = &payload.description {
        builder.push(", description = ").push_bind(description.clone());
    }
    if let Some(start_date) = &payload.start_date {
        builder.push(", start_date = ").push_bind(parse_datetime(start_date)?);
    }
    if let Some(end_date) = &payload.end_date {
        builder.push(", end_date = ").push_bind(parse_datetime(end_date)?);
    }
    builder
        .push(" WHERE id = ")
        .push_bind(*event_id)
        .push(" RETURNING *");

    let event = builder
        .build_query_as::<ActivityEvent>()
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "event": EventWithCode::from(event) }),
        "Event updated successfully",
    ))
}

// DELETE /api/events/:id
pub async fn delete_event(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let row = fetch_event_with_owner(&pool, *event_id).await?;
    if !user.can_manage(row.owner_id) {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this event".to_string(),
        ));
    }

    sqlx::query("DELETE FROM activity_events WHERE id = $1")
        .bind(*event_id)
        .execute(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok_empty("Event deleted successfully"))
}
