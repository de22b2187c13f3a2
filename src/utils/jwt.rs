use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

use actix_web::dev::ServiceRequest;
use actix_web::{web, HttpMessage, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::errors::AppError;
use crate::models::user::AuthUser;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

/// Issues a 7-day HS256 token for the given user.
pub fn generate_token(user_id: Uuid, username: &str, role: &str) -> Result<String, AppError> {
    let secret = env::var("JWT_SECRET")
        .map_err(|_| AppError::InternalServerError("JWT_SECRET must be set".to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(7)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))
}

/// Validates a JWT token and returns the claims if valid.
pub fn validate_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = env::var("JWT_SECRET").unwrap_or_default();
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map(|data| data.claims)
}

async fn load_user(pool: &PgPool, claims: &Claims) -> Result<AuthUser, AppError> {
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token. User not found.".to_string()))?;

    sqlx::query_as::<_, AuthUser>(
        "SELECT id, username, email, first_name, last_name, role, avatar_url
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db)?
    .ok_or_else(|| AppError::Unauthorized("Invalid token. User not found.".to_string()))
}

/// Validator function for the `HttpAuthentication::bearer` middleware.
/// Verifies the token, loads the user and attaches it to the request.
pub async fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let claims = match validate_token(credentials.token()) {
        Ok(claims) => claims,
        Err(_) => {
            return Err((
                AppError::Unauthorized("Invalid or expired token. Please login.".to_string())
                    .into(),
                req,
            ))
        }
    };

    let pool = match req.app_data::<web::Data<PgPool>>() {
        Some(pool) => pool.clone(),
        None => {
            return Err((
                AppError::InternalServerError("Database pool not configured".to_string()).into(),
                req,
            ))
        }
    };

    match load_user(&pool, &claims).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

/// Returns the user attached by the bearer middleware.
pub fn current_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required.".to_string()))
}

/// Best-effort authentication for routes that are public but role-aware,
/// e.g. the activity listing. Missing or bad credentials yield `None`.
pub async fn try_authenticate(req: &HttpRequest, pool: &PgPool) -> Option<AuthUser> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))?;

    let claims = validate_token(token).ok()?;
    load_user(pool, &claims).await.ok()
}

/// Strict variant of [`try_authenticate`] for mixed-access scopes that are
/// not behind the bearer middleware.
pub async fn authenticate(req: &HttpRequest, pool: &PgPool) -> Result<AuthUser, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("No token provided. Please login.".to_string()))?;

    let claims = validate_token(token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token. Please login.".to_string()))?;

    load_user(pool, &claims).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_claims() {
        env::set_var("JWT_SECRET", "test-secret");
        let user_id = Uuid::new_v4();
        let token = generate_token(user_id, "somchai", "organizer").unwrap();
        let claims = validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "somchai");
        assert_eq!(claims.role, "organizer");
    }

    #[test]
    fn tampered_token_is_rejected() {
        env::set_var("JWT_SECRET", "test-secret");
        let token = generate_token(Uuid::new_v4(), "somchai", "student").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        assert!(validate_token(&tampered).is_err());
    }
}
