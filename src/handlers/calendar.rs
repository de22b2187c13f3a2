use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeMap;

use crate::errors::AppError;
use crate::models::event::ActivityEvent;
use crate::models::registration::status as registration_status;
use crate::utils::calendar::{date_span_keys, format_date_key};
use crate::utils::jwt;
use crate::utils::response;

#[derive(sqlx::FromRow, Serialize, Clone)]
struct CalendarEvent {
    #[serde(flatten)]
    #[sqlx(flatten)]
    event: ActivityEvent,
    activity_title: String,
}

// GET /api/calendar
//
// Buckets the events of the caller's actively registered activities by
// calendar day, one entry per day an event spans.
pub async fn get_calendar(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let events = sqlx::query_as::<_, CalendarEvent>(
        "SELECT e.*, a.title AS activity_title
         FROM activity_events e
         JOIN activities a ON a.id = e.activity_id
         JOIN registrations r ON r.activity_id = e.activity_id
         WHERE r.user_id = $1 AND r.registration_status = $2
         ORDER BY e.start_date ASC",
    )
    .bind(user.id)
    .bind(registration_status::REGISTERED)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let mut calendar: BTreeMap<String, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        for day in date_span_keys(event.event.start_date, event.event.end_date) {
            calendar
                .entry(format_date_key(day))
                .or_default()
                .push(event.clone());
        }
    }

    Ok(response::ok(
        json!({ "calendar": calendar }),
        "Calendar retrieved successfully",
    ))
}
