mod common;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use activity_board_backend::api_routes;
use activity_board_backend::models::user::roles;

macro_rules! init_app {
    ($pool:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .configure(api_routes),
        )
        .await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn registering_when_full_is_rejected() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, _) = common::create_test_user(&pool, roles::ORGANIZER).await;
    let activity_id =
        common::create_test_activity(&pool, organizer_id, Some(1), "approved").await;

    let (_, first_token) = common::create_test_user(&pool, roles::STUDENT).await;
    let (_, second_token) = common::create_test_user(&pool, roles::STUDENT).await;

    let req = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&first_token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&second_token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Activity is full");
}

#[actix_web::test]
async fn cancelling_twice_is_rejected() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, _) = common::create_test_user(&pool, roles::ORGANIZER).await;
    let activity_id =
        common::create_test_activity(&pool, organizer_id, Some(10), "approved").await;
    let (_, token) = common::create_test_user(&pool, roles::STUDENT).await;

    let req = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let registration_id = body["data"]["registration"]["id"]
        .as_str()
        .expect("registration id")
        .to_string();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/registrations/{}", registration_id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/registrations/{}", registration_id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Registration already cancelled");
}

#[actix_web::test]
async fn last_seat_has_a_single_winner() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, _) = common::create_test_user(&pool, roles::ORGANIZER).await;
    let activity_id =
        common::create_test_activity(&pool, organizer_id, Some(1), "approved").await;

    let (_, first_token) = common::create_test_user(&pool, roles::STUDENT).await;
    let (_, second_token) = common::create_test_user(&pool, roles::STUDENT).await;

    let first = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&first_token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    let second = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&second_token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();

    let (first_resp, second_resp) = futures_util::future::join(
        test::call_service(&app, first),
        test::call_service(&app, second),
    )
    .await;

    let successes = [first_resp.status(), second_resp.status()]
        .iter()
        .filter(|status| status.is_success())
        .count();
    assert_eq!(successes, 1, "exactly one register may claim the last seat");

    let count: i32 = sqlx::query_scalar(
        "SELECT current_participants FROM activities WHERE id = $1",
    )
    .bind(activity_id)
    .fetch_one(&pool)
    .await
    .expect("participant count");
    assert_eq!(count, 1);
}

#[actix_web::test]
async fn students_never_see_unapproved_activities() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, organizer_token) =
        common::create_test_user(&pool, roles::ORGANIZER).await;
    let pending_id =
        common::create_test_activity(&pool, organizer_id, None, "pending").await;
    let rejected_id =
        common::create_test_activity(&pool, organizer_id, None, "rejected").await;
    let approved_id =
        common::create_test_activity(&pool, organizer_id, None, "approved").await;

    let (_, student_token) = common::create_test_user(&pool, roles::STUDENT).await;

    let req = test::TestRequest::get()
        .uri("/api/activities")
        .insert_header(bearer(&student_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let ids: Vec<String> = body["data"]["activities"]
        .as_array()
        .expect("activities array")
        .iter()
        .map(|a| a["id"].as_str().unwrap_or_default().to_string())
        .collect();

    assert!(ids.contains(&approved_id.to_string()));
    assert!(!ids.contains(&pending_id.to_string()));
    assert!(!ids.contains(&rejected_id.to_string()));

    // The organizer still sees their own pending submission.
    let req = test::TestRequest::get()
        .uri("/api/activities")
        .insert_header(bearer(&organizer_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    let ids: Vec<String> = body["data"]["activities"]
        .as_array()
        .expect("activities array")
        .iter()
        .map(|a| a["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert!(ids.contains(&pending_id.to_string()));
}

#[actix_web::test]
async fn duplicate_check_in_is_rejected() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, _) = common::create_test_user(&pool, roles::ORGANIZER).await;
    let activity_id =
        common::create_test_activity(&pool, organizer_id, Some(10), "approved").await;
    let event_id = common::create_test_event(&pool, activity_id).await;
    let (_, token) = common::create_test_user(&pool, roles::STUDENT).await;

    let req = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let qr_data = json!({ "eventId": event_id, "code": "testcode12" }).to_string();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(bearer(&token))
        .set_json(json!({ "qrData": qr_data }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(bearer(&token))
        .set_json(json!({ "eventId": event_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Already checked in to this event");
}

#[actix_web::test]
async fn wrong_check_in_code_is_rejected() {
    let Some(pool) = common::setup_test_db().await else {
        return;
    };
    let app = init_app!(pool);

    let (organizer_id, _) = common::create_test_user(&pool, roles::ORGANIZER).await;
    let activity_id =
        common::create_test_activity(&pool, organizer_id, Some(10), "approved").await;
    let event_id = common::create_test_event(&pool, activity_id).await;
    let (_, token) = common::create_test_user(&pool, roles::STUDENT).await;

    let req = test::TestRequest::post()
        .uri("/api/registrations")
        .insert_header(bearer(&token))
        .set_json(json!({ "activityId": activity_id }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let qr_data = json!({ "eventId": event_id, "code": "wrongcode0" }).to_string();
    let req = test::TestRequest::post()
        .uri("/api/attendance/check-in")
        .insert_header(bearer(&token))
        .set_json(json!({ "qrData": qr_data }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid check-in code");
}
