use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::handlers::notification::create_notification;
use crate::models::activity::{approval, Activity, ActivityItem, ActivityWithCreator};
use crate::models::registration::status as registration_status;
use crate::models::user::{AuthUser, PublicUser, PUBLIC_USER_COLUMNS};
use crate::utils::jwt;
use crate::utils::response;
use crate::utils::validation::validate_role;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    rejection_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RoleUpdateRequest {
    role: String,
}

#[derive(Deserialize)]
pub struct UserListQuery {
    role: Option<String>,
    search: Option<String>,
}

#[derive(sqlx::FromRow)]
struct UserCounts {
    total: i64,
    students: i64,
    organizers: i64,
    admins: i64,
}

#[derive(sqlx::FromRow)]
struct ActivityCounts {
    total: i64,
    pending: i64,
    approved: i64,
    rejected: i64,
    active: i64,
    completed: i64,
}

fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied. Admin role required.".to_string(),
        ));
    }
    Ok(())
}

// GET /api/admin/pending-activities
pub async fn pending_activities(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;

    let activities: Vec<ActivityItem> = sqlx::query_as::<_, ActivityWithCreator>(
        "SELECT a.*, u.username AS creator_username, u.first_name AS creator_first_name,
                u.last_name AS creator_last_name
         FROM activities a JOIN users u ON u.id = a.created_by
         WHERE a.approval_status = $1
         ORDER BY a.created_at DESC",
    )
    .bind(approval::PENDING)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?
    .into_iter()
    .map(ActivityItem::from)
    .collect();

    Ok(response::ok(
        json!({ "activities": activities }),
        "Pending activities retrieved successfully",
    ))
}

// PUT /api/admin/activities/:id/approve
pub async fn approve_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;

    let activity = sqlx::query_as::<_, Activity>(
        "UPDATE activities
         SET approval_status = $1, approved_by = $2, approved_at = NOW(), updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(approval::APPROVED)
    .bind(user.id)
    .bind(*activity_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    create_notification(
        &pool,
        activity.created_by,
        "Activity approved",
        &format!("Your activity \"{}\" has been approved", activity.title),
        "activity_approved",
        Some(activity.id),
    )
    .await;

    Ok(response::ok(
        json!({ "activity": activity }),
        "Activity approved successfully",
    ))
}

// PUT /api/admin/activities/:id/reject
pub async fn reject_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
    payload: web::Json<RejectRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;

    let activity = sqlx::query_as::<_, Activity>(
        "UPDATE activities
         SET approval_status = $1, approved_by = $2, approved_at = NOW(),
             rejection_reason = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(approval::REJECTED)
    .bind(user.id)
    .bind(&payload.rejection_reason)
    .bind(*activity_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    create_notification(
        &pool,
        activity.created_by,
        "Activity rejected",
        &format!("Your activity \"{}\" has been rejected", activity.title),
        "activity_rejected",
        Some(activity.id),
    )
    .await;

    Ok(response::ok(
        json!({ "activity": activity }),
        "Activity rejected",
    ))
}

// GET /api/admin/statistics
pub async fn statistics(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;

    let users = sqlx::query_as::<_, UserCounts>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE role = 'student') AS students,
                COUNT(*) FILTER (WHERE role = 'organizer') AS organizers,
                COUNT(*) FILTER (WHERE role = 'admin') AS admins
         FROM users",
    )
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    let activities = sqlx::query_as::<_, ActivityCounts>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE approval_status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE approval_status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE approval_status = 'rejected') AS rejected,
                COUNT(*) FILTER (WHERE status = 'open') AS active,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed
         FROM activities",
    )
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    let registrations: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM registrations WHERE registration_status = $1",
    )
    .bind(registration_status::REGISTERED)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_events")
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    let attendance_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok(
        json!({
            "statistics": {
                "users": {
                    "total": users.total,
                    "students": users.students,
                    "organizers": users.organizers,
                    "admins": users.admins,
                },
                "activities": {
                    "total": activities.total,
                    "pending": activities.pending,
                    "approved": activities.approved,
                    "rejected": activities.rejected,
                    "active": activities.active,
                    "completed": activities.completed,
                },
                "registrations": registrations,
                "events": events,
                "attendanceRecords": attendance_records,
            },
        }),
        "Statistics retrieved successfully",
    ))
}

// GET /api/admin/users
pub async fn list_users(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;

    if let Some(role) = &query.role {
        validate_role(role)?;
    }

    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {} FROM users WHERE 1=1",
        PUBLIC_USER_COLUMNS
    ));
    if let Some(role) = &query.role {
        builder.push(" AND role = ").push_bind(role.clone());
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        builder
            .push(" AND (username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR student_id ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    builder.push(" ORDER BY created_at DESC");

    let users = builder
        .build_query_as::<PublicUser>()
        .fetch_all(&**pool)
        .await
        .map_err(AppError::db)?;

    Ok(response::ok(
        json!({ "users": users }),
        "Users retrieved successfully",
    ))
}

// PUT /api/admin/users/:id/role
pub async fn update_user_role(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
    payload: web::Json<RoleUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    require_admin(&user)?;
    validate_role(&payload.role)?;

    let updated = sqlx::query_as::<_, PublicUser>(&format!(
        "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
        PUBLIC_USER_COLUMNS
    ))
    .bind(&payload.role)
    .bind(*user_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(response::ok(
        json!({ "user": updated }),
        "User role updated successfully",
    ))
}
