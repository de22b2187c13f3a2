use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::attendance::{status, Attendance};
use crate::models::event::{ActivityEvent, EventWithOwner};
use crate::models::registration::{status as registration_status, Registration};
use crate::models::user::ParticipantInfo;
use crate::utils::jwt;
use crate::utils::qr;
use crate::utils::response;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    event_id: Option<Uuid>,
    qr_data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyStatsQuery {
    activity_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendanceStats {
    total_events: i64,
    past_events: i64,
    upcoming_events: i64,
    attended: i64,
    absent: i64,
    attendance_rate: f64,
    events: Vec<EventAttendance>,
}

#[derive(Serialize)]
struct EventAttendance {
    #[serde(flatten)]
    event: ActivityEvent,
    attended: bool,
}

#[derive(sqlx::FromRow)]
struct AttendanceUserRow {
    #[sqlx(flatten)]
    attendance: Attendance,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: String,
    phone: Option<String>,
    student_id: Option<String>,
}

#[derive(Serialize)]
struct AttendanceEntry {
    #[serde(flatten)]
    attendance: Attendance,
    user: ParticipantInfo,
}

impl From<AttendanceUserRow> for AttendanceEntry {
    fn from(row: AttendanceUserRow) -> Self {
        let user = ParticipantInfo {
            id: row.attendance.user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            student_id: row.student_id,
        };
        AttendanceEntry {
            attendance: row.attendance,
            user,
        }
    }
}

#[derive(Serialize)]
struct ParticipantEntry {
    #[serde(flatten)]
    registration: Registration,
    user: ParticipantInfo,
    events_attended: i64,
}

#[derive(sqlx::FromRow)]
struct ParticipantRow {
    #[sqlx(flatten)]
    registration: Registration,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: String,
    phone: Option<String>,
    student_id: Option<String>,
    events_attended: i64,
}

fn build_stats(
    events: Vec<ActivityEvent>,
    attendance: &[Attendance],
    now: DateTime<Utc>,
) -> AttendanceStats {
    let total_events = events.len() as i64;
    let past_events = events.iter().filter(|e| e.start_date < now).count() as i64;
    let upcoming_events = total_events - past_events;
    let attended = attendance
        .iter()
        .filter(|a| a.status == status::PRESENT)
        .count() as i64;
    let absent = past_events - attended;
    let attendance_rate = if past_events > 0 {
        ((attended as f64 / past_events as f64) * 10_000.0).round() / 100.0
    } else {
        0.0
    };

    let events = events
        .into_iter()
        .map(|event| {
            let attended = attendance
                .iter()
                .any(|a| a.event_id == event.id && a.status == status::PRESENT);
            EventAttendance { event, attended }
        })
        .collect();

    AttendanceStats {
        total_events,
        past_events,
        upcoming_events,
        attended,
        absent,
        attendance_rate,
        events,
    }
}

// POST /api/attendance/check-in
pub async fn check_in(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let (event_id, code) = match (&payload.qr_data, payload.event_id) {
        (Some(raw), _) => {
            let parsed = qr::parse_payload(raw)?;
            (parsed.event_id, parsed.code)
        }
        (None, Some(event_id)) => (event_id, None),
        (None, None) => {
            return Err(AppError::BadRequest(
                "Event id or QR payload is required".to_string(),
            ))
        }
    };

    let event = sqlx::query_as::<_, ActivityEvent>(
        "SELECT * FROM activity_events WHERE id = $1",
    )
    .bind(event_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if let Some(code) = code {
        if code != event.check_in_code {
            return Err(AppError::BadRequest("Invalid check-in code".to_string()));
        }
    }

    let registered: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM registrations
         WHERE user_id = $1 AND activity_id = $2 AND registration_status = $3",
    )
    .bind(user.id)
    .bind(event.activity_id)
    .bind(registration_status::REGISTERED)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?;

    if registered.is_none() {
        return Err(AppError::Forbidden(
            "You are not registered for this activity".to_string(),
        ));
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM attendance WHERE user_id = $1 AND event_id = $2")
            .bind(user.id)
            .bind(event_id)
            .fetch_optional(&**pool)
            .await
            .map_err(AppError::db)?;

    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Already checked in to this event".to_string(),
        ));
    }

    let attendance = sqlx::query_as::<_, Attendance>(
        "INSERT INTO attendance (id, user_id, activity_id, event_id, status)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(event.activity_id)
    .bind(event_id)
    .bind(status::PRESENT)
    .fetch_one(&**pool)
    .await
    .map_err(AppError::db)?;

    Ok(response::created(
        json!({ "attendance": attendance }),
        "Checked in successfully",
    ))
}

// GET /api/attendance/my-stats?activityId=...
pub async fn my_stats(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    query: web::Query<MyStatsQuery>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let events = sqlx::query_as::<_, ActivityEvent>(
        "SELECT * FROM activity_events WHERE activity_id = $1 ORDER BY start_date ASC",
    )
    .bind(query.activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let attendance = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE user_id = $1 AND activity_id = $2",
    )
    .bind(user.id)
    .bind(query.activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let stats = build_stats(events, &attendance, Utc::now());

    Ok(response::ok(
        json!({ "stats": stats }),
        "Stats retrieved successfully",
    ))
}

// GET /api/attendance/activity/:id
pub async fn activity_attendance(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    activity_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT created_by FROM activities WHERE id = $1")
        .bind(*activity_id)
        .fetch_optional(&**pool)
        .await
        .map_err(AppError::db)?;
    let (owner,) = owner.ok_or_else(|| AppError::NotFound("Activity not found".to_string()))?;

    if !user.can_manage(owner) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let participants: Vec<ParticipantEntry> = sqlx::query_as::<_, ParticipantRow>(
        "SELECT r.*, u.username, u.first_name, u.last_name, u.email, u.phone, u.student_id,
            (SELECT COUNT(*) FROM attendance att
             WHERE att.user_id = r.user_id AND att.activity_id = r.activity_id
               AND att.status = 'present') AS events_attended
         FROM registrations r JOIN users u ON u.id = r.user_id
         WHERE r.activity_id = $1
         ORDER BY r.registered_at DESC",
    )
    .bind(*activity_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?
    .into_iter()
    .map(|row| ParticipantEntry {
        user: ParticipantInfo {
            id: row.registration.user_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            student_id: row.student_id,
        },
        events_attended: row.events_attended,
        registration: row.registration,
    })
    .collect();

    Ok(response::ok(
        json!({ "participants": participants }),
        "Attendance retrieved successfully",
    ))
}

// GET /api/attendance/event/:id
pub async fn event_attendance(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let row = sqlx::query_as::<_, EventWithOwner>(
        "SELECT e.*, a.created_by AS owner_id
         FROM activity_events e JOIN activities a ON a.id = e.activity_id
         WHERE e.id = $1",
    )
    .bind(*event_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if !user.can_manage(row.owner_id) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    let checked_in: Vec<AttendanceEntry> = sqlx::query_as::<_, AttendanceUserRow>(
        "SELECT att.*, u.username, u.first_name, u.last_name, u.email, u.phone, u.student_id
         FROM attendance att JOIN users u ON u.id = att.user_id
         WHERE att.event_id = $1
         ORDER BY att.check_in_time DESC",
    )
    .bind(*event_id)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?
    .into_iter()
    .map(AttendanceEntry::from)
    .collect();

    let registered = sqlx::query_as::<_, ParticipantInfo>(
        "SELECT u.id, u.username, u.first_name, u.last_name, u.email, u.phone, u.student_id
         FROM registrations r JOIN users u ON u.id = r.user_id
         WHERE r.activity_id = $1 AND r.registration_status = $2",
    )
    .bind(row.event.activity_id)
    .bind(registration_status::REGISTERED)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let checked_in_ids: Vec<Uuid> = checked_in.iter().map(|entry| entry.user.id).collect();
    let not_checked_in: Vec<ParticipantInfo> = registered
        .iter()
        .filter(|participant| !checked_in_ids.contains(&participant.id))
        .cloned()
        .collect();

    Ok(response::ok(
        json!({
            "event": row.event,
            "checkedIn": checked_in,
            "notCheckedIn": not_checked_in,
            "summary": {
                "total": registered.len(),
                "present": checked_in.len(),
                "absent": not_checked_in.len(),
            },
        }),
        "Event attendance retrieved successfully",
    ))
}

// POST /api/attendance/event/:id/mark-absences
pub async fn mark_absences(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = jwt::current_user(&req)?;

    let row = sqlx::query_as::<_, EventWithOwner>(
        "SELECT e.*, a.created_by AS owner_id
         FROM activity_events e JOIN activities a ON a.id = e.activity_id
         WHERE e.id = $1",
    )
    .bind(*event_id)
    .fetch_optional(&**pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if !user.can_manage(row.owner_id) {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }

    if row.event.start_date > Utc::now() {
        return Err(AppError::BadRequest(
            "Cannot mark absences for future events".to_string(),
        ));
    }

    let registered: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT user_id FROM registrations
         WHERE activity_id = $1 AND registration_status = $2",
    )
    .bind(row.event.activity_id)
    .bind(registration_status::REGISTERED)
    .fetch_all(&**pool)
    .await
    .map_err(AppError::db)?;

    let existing: Vec<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM attendance WHERE event_id = $1")
            .bind(*event_id)
            .fetch_all(&**pool)
            .await
            .map_err(AppError::db)?;

    let existing_ids: Vec<Uuid> = existing.into_iter().map(|(id,)| id).collect();
    let absent_users: Vec<Uuid> = registered
        .into_iter()
        .map(|(id,)| id)
        .filter(|id| !existing_ids.contains(id))
        .collect();

    if !absent_users.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO attendance (id, user_id, activity_id, event_id, status) ",
        );
        builder.push_values(absent_users.iter(), |mut b, user_id| {
            b.push_bind(Uuid::new_v4())
                .push_bind(*user_id)
                .push_bind(row.event.activity_id)
                .push_bind(*event_id)
                .push_bind(status::ABSENT);
        });
        builder
            .build()
            .execute(&**pool)
            .await
            .map_err(AppError::db)?;
    }

    Ok(response::ok(
        json!({ "markedAbsent": absent_users.len() }),
        &format!("Marked {} absences", absent_users.len()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: Uuid, activity_id: Uuid, start: DateTime<Utc>) -> ActivityEvent {
        ActivityEvent {
            id,
            activity_id,
            title: "Session".to_string(),
            description: None,
            start_date: start,
            end_date: start + chrono::Duration::hours(2),
            check_in_code: "abcDEF1234".to_string(),
            created_at: start,
            updated_at: start,
        }
    }

    fn present(user_id: Uuid, activity_id: Uuid, event_id: Uuid, at: DateTime<Utc>) -> Attendance {
        Attendance {
            id: Uuid::new_v4(),
            user_id,
            activity_id,
            event_id,
            status: status::PRESENT.to_string(),
            check_in_time: at,
        }
    }

    #[test]
    fn stats_split_past_and_upcoming() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let activity_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let past_a = event(Uuid::new_v4(), activity_id, now - chrono::Duration::days(7));
        let past_b = event(Uuid::new_v4(), activity_id, now - chrono::Duration::days(3));
        let future = event(Uuid::new_v4(), activity_id, now + chrono::Duration::days(3));

        let attendance = vec![present(user_id, activity_id, past_a.id, past_a.start_date)];
        let stats = build_stats(vec![past_a, past_b, future], &attendance, now);

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.past_events, 2);
        assert_eq!(stats.upcoming_events, 1);
        assert_eq!(stats.attended, 1);
        assert_eq!(stats.absent, 1);
        assert_eq!(stats.attendance_rate, 50.0);
        assert!(stats.events[0].attended);
        assert!(!stats.events[1].attended);
    }

    #[test]
    fn no_past_events_means_zero_rate() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let activity_id = Uuid::new_v4();
        let future = event(Uuid::new_v4(), activity_id, now + chrono::Duration::days(1));

        let stats = build_stats(vec![future], &[], now);
        assert_eq!(stats.attendance_rate, 0.0);
        assert_eq!(stats.upcoming_events, 1);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let activity_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let events: Vec<ActivityEvent> = (1..=3)
            .map(|i| {
                event(
                    Uuid::new_v4(),
                    activity_id,
                    now - chrono::Duration::days(i),
                )
            })
            .collect();
        let attendance = vec![present(
            user_id,
            activity_id,
            events[0].id,
            events[0].start_date,
        )];

        let stats = build_stats(events, &attendance, now);
        assert_eq!(stats.attendance_rate, 33.33);
    }
}
