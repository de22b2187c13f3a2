use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::Notification;
use crate::models::registration::Registration;
use crate::utils::jwt;
use crate::utils::response;

#[derive(Deserialize)]
pub struct NotificationListQuery {
    limit: Option<i64>,
    unread: Option<bool>,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    enabled: bool,
}

/// Fire-and-forget insert used by workflows that notify users as a side
/// effect. Failures are logged and never surfaced to the caller.
pub async fn create_notification(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    notification_type: &str,
    related_activity_id: Option<Uuid>,
) {
    let result = sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, type, related_activity_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(notification_type)
    .bind(related_activity_id)
    .execute(pool)
    .await;

    if let Err(err) = result {
        log::error!("failed to create notification: {}", err);
    }
}

// GET /api/notifications
pub async fn list_notifications(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    query: web::Query<NotificationListQuery>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    let limit = query.limit.unwrap_or(50);

    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT * FROM notifications WHERE user_id = ");
    builder.push_bind(user.id);
    if query.unread == Some(true) {
        builder.push(" AND is_read = FALSE");
    }
    builder.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

    let notifications = builder
        .build_query_as::<Notification>()
        .fetch_all(&**pool)
        .await
        .map_err(AppError::db)?;

    let unread_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user.id)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "notifications": notifications, "unreadCount": unread_count }),
        "Notifications retrieved successfully",
    ))
}

// PUT /api/notifications/:id/read
pub async fn mark_as_read(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let notification = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(*notification_id)
    .bind(user.id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    Ok(response::ok(
        json!({ "notification": notification }),
        "Notification marked as read",
    ))
}

// PUT /api/notifications/read-all
pub async fn mark_all_as_read(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
        .bind(user.id)
        .execute(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok_empty("All notifications marked as read"))
}

// DELETE /api/notifications/:id
pub async fn delete_notification(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let deleted = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(*notification_id)
        .bind(user.id)
        .execute(&**pool)
        .await
        .map_err(AppError::db)?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    Ok(response::ok_empty("Notification deleted"))
}

// PUT /api/notifications/activity/:activityId/toggle
pub async fn toggle_activity_notifications(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
    payload: web::Json<ToggleRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let registration = sqlx::query_as::<_, Registration>(
        "UPDATE registrations SET notifications_enabled = $1
         WHERE user_id = $2 AND activity_id = $3
         RETURNING *",
    )
    .bind(payload.enabled)
    .bind(user.id)
    .bind(*activity_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| {
        AppError::NotFound("You are not registered for this activity".to_string())
    })?;

    let message = if payload.enabled {
        "Notifications enabled for this activity"
    } else {
        "Notifications disabled for this activity"
    };

    Ok(response::ok(json!({ "registration": registration }), message))
}
