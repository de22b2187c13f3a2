pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod utils;

use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Activity Board API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// The full `/api` route table, shared by the binary and the integration
/// tests. The activities scope handles auth itself because its listing and
/// detail routes are public but role-aware.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    let auth = HttpAuthentication::bearer(utils::jwt::validator);

    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/register")
                            .route(web::post().to(handlers::auth::register)),
                    )
                    .service(
                        web::resource("/login").route(web::post().to(handlers::auth::login)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(auth.clone())
                            .route(web::get().to(handlers::auth::me)),
                    )
                    .service(
                        web::resource("/logout")
                            .wrap(auth.clone())
                            .route(web::post().to(handlers::auth::logout)),
                    ),
            )
            .service(
                web::scope("/activities")
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::activity::list_activities))
                            .route(web::post().to(handlers::activity::create_activity)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(handlers::activity::get_activity))
                            .route(web::put().to(handlers::activity::update_activity))
                            .route(web::delete().to(handlers::activity::delete_activity)),
                    ),
            )
            .service(
                web::scope("/registrations")
                    .wrap(auth.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::registration::list_my_registrations))
                            .route(web::post().to(handlers::registration::register_for_activity)),
                    )
                    .service(
                        web::resource("/activity/{activityId}").route(
                            web::get().to(handlers::registration::list_activity_registrations),
                        ),
                    )
                    .service(
                        web::resource("/{id}/remove")
                            .route(web::delete().to(handlers::registration::remove_participant)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(handlers::registration::cancel_registration)),
                    ),
            )
            .service(
                web::scope("/events")
                    .wrap(auth.clone())
                    .service(
                        web::resource("").route(web::post().to(handlers::event::create_event)),
                    )
                    .service(
                        web::resource("/activity/{activityId}")
                            .route(web::get().to(handlers::event::list_activity_events)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(handlers::event::get_event))
                            .route(web::put().to(handlers::event::update_event))
                            .route(web::delete().to(handlers::event::delete_event)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .wrap(auth.clone())
                    .service(
                        web::resource("/check-in")
                            .route(web::post().to(handlers::attendance::check_in)),
                    )
                    .service(
                        web::resource("/my-stats")
                            .route(web::get().to(handlers::attendance::my_stats)),
                    )
                    .service(
                        web::resource("/activity/{id}")
                            .route(web::get().to(handlers::attendance::activity_attendance)),
                    )
                    .service(
                        web::resource("/event/{id}/mark-absences")
                            .route(web::post().to(handlers::attendance::mark_absences)),
                    )
                    .service(
                        web::resource("/event/{id}")
                            .route(web::get().to(handlers::attendance::event_attendance)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .wrap(auth.clone())
                    .service(
                        web::resource("/pending-activities")
                            .route(web::get().to(handlers::admin::pending_activities)),
                    )
                    .service(
                        web::resource("/activities/{id}/approve")
                            .route(web::put().to(handlers::admin::approve_activity)),
                    )
                    .service(
                        web::resource("/activities/{id}/reject")
                            .route(web::put().to(handlers::admin::reject_activity)),
                    )
                    .service(
                        web::resource("/statistics")
                            .route(web::get().to(handlers::admin::statistics)),
                    )
                    .service(
                        web::resource("/users/{id}/role")
                            .route(web::put().to(handlers::admin::update_user_role)),
                    )
                    .service(
                        web::resource("/users").route(web::get().to(handlers::admin::list_users)),
                    ),
            )
            .service(
                web::scope("/profile")
                    .wrap(auth.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::profile::get_profile))
                            .route(web::put().to(handlers::profile::update_profile)),
                    )
                    .service(
                        web::resource("/password")
                            .route(web::put().to(handlers::profile::change_password)),
                    )
                    .service(
                        web::resource("/avatar")
                            .route(web::post().to(handlers::profile::upload_avatar)),
                    )
                    .service(
                        web::resource("/stats")
                            .route(web::get().to(handlers::profile::profile_stats)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .wrap(auth.clone())
                    .service(
                        web::resource("")
                            .route(web::get().to(handlers::notification::list_notifications)),
                    )
                    .service(
                        web::resource("/read-all")
                            .route(web::put().to(handlers::notification::mark_all_as_read)),
                    )
                    .service(
                        web::resource("/activity/{activityId}/toggle").route(
                            web::put().to(handlers::notification::toggle_activity_notifications),
                        ),
                    )
                    .service(
                        web::resource("/{id}/read")
                            .route(web::put().to(handlers::notification::mark_as_read)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::delete().to(handlers::notification::delete_notification)),
                    ),
            )
            .service(
                web::scope("/calendar").wrap(auth).service(
                    web::resource("").route(web::get().to(handlers::calendar::get_calendar)),
                ),
            ),
    );
}
