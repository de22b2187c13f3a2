use actix_web::HttpResponse;
use serde::Serialize;

/// The `{ success, message, data }` envelope every endpoint responds with.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
    })
}

pub fn ok_empty(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> {
        success: true,
        message: message.to_string(),
        data: None,
    })
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
    })
}
