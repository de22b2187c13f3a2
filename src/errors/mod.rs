use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    BadRequest(String),
    Validation(Vec<String>),
    InternalServerError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl AppError {
    /// Maps any database failure to an opaque 500 and logs the cause.
    pub fn db(err: sqlx::Error) -> Self {
        log::error!("database error: {}", err);
        AppError::InternalServerError("Database error".to_string())
    }

    fn message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::Validation(_) => "Validation error".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Validation(errors) => write!(f, "Validation error: {}", errors.join(", ")),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            AppError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            success: false,
            message: self.message(),
            errors,
        };
        match self {
            AppError::NotFound(_) => HttpResponse::NotFound().json(body),
            AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(body),
            AppError::Forbidden(_) => HttpResponse::Forbidden().json(body),
            AppError::Conflict(_) => HttpResponse::Conflict().json(body),
            AppError::BadRequest(_) | AppError::Validation(_) => {
                HttpResponse::BadRequest().json(body)
            }
            AppError::InternalServerError(_) => HttpResponse::InternalServerError().json(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;

    #[actix_web::test]
    async fn status_codes_match_variants() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Validation(vec!["x".into()]), StatusCode::BAD_REQUEST),
            (
                AppError::InternalServerError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.error_response().status(), expected);
        }
    }

    #[actix_web::test]
    async fn validation_body_carries_field_errors() {
        let err = AppError::Validation(vec!["Title is required".to_string()]);
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation error");
        assert_eq!(body["errors"][0], "Title is required");
    }

    #[actix_web::test]
    async fn plain_errors_omit_errors_field() {
        let err = AppError::NotFound("Activity not found".to_string());
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Activity not found");
        assert!(body.get("errors").is_none());
    }
}
