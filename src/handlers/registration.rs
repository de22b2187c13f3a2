use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::activity::{status as activity_status, Activity};
use crate::models::registration::{status, Registration, RegistrationWithUser};
use crate::models::user::ParticipantInfo;
use crate::utils::jwt;
use crate::utils::response;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCreateRequest {
    activity_id: Uuid,
}

#[derive(Serialize)]
struct RegistrationWithActivity {
    #[serde(flatten)]
    registration: Registration,
    activity: Option<Activity>,
}

#[derive(sqlx::FromRow)]
struct RegistrationWithOwner {
    #[sqlx(flatten)]
    registration: Registration,
    activity_created_by: Uuid,
}

#[derive(Serialize)]
struct RegistrantEntry {
    #[serde(flatten)]
    registration: Registration,
    user: ParticipantInfo,
}

impl From<RegistrationWithUser> for RegistrantEntry {
    fn from(row: RegistrationWithUser) -> Self {
        let user = ParticipantInfo {
            id: row.registration.user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            student_id: row.student_id,
        };
        RegistrantEntry {
            registration: row.registration,
            user,
        }
    }
}

// GET /api/registrations
pub async fn list_my_registrations(
    req: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let registrations = sqlx::query_as::<_, Registration>(
        "SELECT * FROM registrations WHERE user_id = $1 ORDER BY registered_at DESC",
    )
    .bind(user.id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let activity_ids: Vec<Uuid> = registrations.iter().map(|r| r.activity_id).collect();
    let activities: HashMap<Uuid, Activity> =
        sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = ANY($1)")
            .bind(&activity_ids)
            .fetch_all(&**pool)
            .await
            .map_err(AppError::db)?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

    let registrations: Vec<RegistrationWithActivity> = registrations
        .into_iter()
        .map(|registration| {
            let activity = activities.get(&registration.activity_id).cloned();
            RegistrationWithActivity {
                registration,
                activity,
            }
        })
        .collect();

    Ok(response::ok(
        json!({ "registrations": registrations }),
        "Registrations retrieved successfully",
    ))
}

// POST /api/registrations
//
// The registration write and the participant-counter update share one
// transaction, and the increment is guarded by the capacity predicate, so
// two concurrent registers cannot both claim the last seat.
pub async fn register_for_activity(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<RegistrationCreateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;
    let activity_id = payload.activity_id;

    let mut tx = pool.begin().await.map_err(AppError::db)?;

    let activity = sqlx::query_as::<_, Activity>("SELECT * FROM activities WHERE id = $1")
        .bind(activity_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::db)?
        .ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if activity.status != activity_status::OPEN {
        return Err(AppError::BadRequest(
            "Activity is not open for registration".to_string(),
        ));
    }

    if let Some(max) = activity.max_participants {
        if activity.current_participants >= max {
            return Err(AppError::BadRequest("Activity is full".to_string()));
        }
    }

    let existing = sqlx::query_as::<_, Registration>(
        "SELECT * FROM registrations WHERE user_id = $1 AND activity_id = $2",
    )
    .bind(user.id)
    .bind(activity_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::db)?;

    let registration = match existing {
        Some(existing) if existing.registration_status == status::REGISTERED => {
            return Err(AppError::BadRequest(
                "Already registered for this activity".to_string(),
            ));
        }
        Some(existing) => {
            // Previously cancelled: flip the row back instead of inserting.
            sqlx::query_as::<_, Registration>(
                "UPDATE registrations
                 SET registration_status = $1, cancelled_at = NULL
                 WHERE id = $2
                 RETURNING *",
            )
            .bind(status::REGISTERED)
            .bind(existing.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::db)?
        }
        None => sqlx::query_as::<_, Registration>(
            "INSERT INTO registrations (id, user_id, activity_id, registration_status)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(activity_id)
        .bind(status::REGISTERED)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::db)?,
    };

    let claimed = sqlx::query(
        "UPDATE activities
         SET current_participants = current_participants + 1
         WHERE id = $1
           AND (max_participants IS NULL OR current_participants < max_participants)",
    )
    .bind(activity_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::db)?
    .rows_affected();

    if claimed == 0 {
        // Lost the race for the last seat.
        tx.rollback().await.map_err(AppError::db)?;
        return Err(AppError::BadRequest("Activity is full".to_string()));
    }

    tx.commit().await.map_err(AppError::db)?;

    Ok(response::created(
        json!({ "registration": registration }),
        "Successfully registered for activity",
    ))
}

// DELETE /api/registrations/:id
pub async fn cancel_registration(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    registration_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let mut tx = pool.begin().await.map_err(AppError::db)?;

    let registration = sqlx::query_as::<_, Registration>(
        "SELECT * FROM registrations WHERE id = $1 AND user_id = $2",
    )
    .bind(*registration_id)
    .bind(user.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

    if registration.registration_status == status::CANCELLED {
        return Err(AppError::BadRequest(
            "Registration already cancelled".to_string(),
        ));
    }

    sqlx::query(
        "UPDATE registrations
         SET registration_status = $1, cancelled_at = NOW()
         WHERE id = $2",
    )
    .bind(status::CANCELLED)
    .bind(*registration_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::db)?;

    sqlx::query(
        "UPDATE activities
         SET current_participants = current_participants - 1
         WHERE id = $1 AND current_participants > 0",
    )
    .bind(registration.activity_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::db)?;

    tx.commit().await.map_err(AppError::db)?;

    Ok(response::ok_empty("Registration cancelled successfully"))
}

// DELETE /api/registrations/:id/remove
pub async fn remove_participant(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    registration_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let mut tx = pool.begin().await.map_err(AppError::db)?;

    let row = sqlx::query_as::<_, RegistrationWithOwner>(
        "SELECT r.*, a.created_by AS activity_created_by
         FROM registrations r JOIN activities a ON a.id = r.activity_id
         WHERE r.id = $1",
    )
    .bind(*registration_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

    if !user.can_manage(row.activity_created_by) {
        return Err(AppError::Forbidden(
            "You do not have permission to remove this participant".to_string(),
        ));
    }

    sqlx::query("DELETE FROM registrations WHERE id = $1")
        .bind(*registration_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::db)?;

    sqlx::query(
        "UPDATE activities
         SET current_participants = current_participants - 1
         WHERE id = $1 AND current_participants > 0",
    )
    .bind(row.registration.activity_id)
    .execute(&mut *tx)
    .await
    .map_err(AppError::db)?;

    tx.commit().await.map_err(AppError::db)?;

    Ok(response::ok_empty("Participant removed successfully"))
}

// GET /api/registrations/activity/:activityId
pub async fn list_activity_registrations(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    if !user.is_admin() {
        let owner: Option<(Uuid,)> =
            sqlx::query_as("SELECT created_by FROM activities WHERE id = $1")
                .bind(*activity_id)
                .fetch_optional(&**pool)
                .await
                .map_err(AppError::db)?;
        let (owner,) = owner.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

        if owner != user.id {
            return Err(AppError::Forbidden(
                "You do not have permission to view these participants".to_string(),
            ));
        }
    }

    let registrations: Vec<RegistrantEntry> = sqlx::query_as::<_, RegistrationWithUser>(
        "SELECT r.*, u.username, u.first_name, u.last_name, u.email, u.phone, u.student_id
         FROM registrations r JOIN users u ON u.id = r.user_id
         WHERE r.activity_id = $1
         ORDER BY r.registered_at DESC",
    )
    .bind(*activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?
    .into_iter()
    .map(RegistrantEntry::from)
    .collect();

    Ok(response::ok(
        json!({ "registrations": registrations }),
        "Registrations retrieved successfully",
    ))
}
