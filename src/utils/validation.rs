use chrono::{DateTime, Utc};
use regex::Regex;
use validator::Validate;

use crate::errors::AppError;
use crate::models::activity::status;
use crate::models::user::roles;

/// Runs derive-based validation and collects the field messages into the
/// response `errors` list.
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|err| {
        let mut messages = Vec::new();
        for (field, errors) in err.field_errors() {
            for error in errors {
                match &error.message {
                    Some(message) => messages.push(message.to_string()),
                    None => messages.push(format!("{} is invalid", field)),
                }
            }
        }
        messages.sort();
        AppError::Validation(messages)
    })
}

pub fn validate_role(role: &str) -> Result<(), AppError> {
    if !roles::ALL.contains(&role) {
        return Err(AppError::BadRequest("Invalid role".to_string()));
    }
    Ok(())
}

pub fn validate_activity_status(value: &str) -> Result<(), AppError> {
    if !status::ALL.contains(&value) {
        return Err(AppError::BadRequest("Invalid status".to_string()));
    }
    Ok(())
}

// Regex validation for uri
pub fn validate_url(uri: &str) -> Result<(), AppError> {
    let re = Regex::new(r"^https?://[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}(/[^\s]*)?$")
        .map_err(|_| AppError::InternalServerError("Invalid URL pattern".to_string()))?;

    if !re.is_match(uri) {
        return Err(AppError::BadRequest("Invalid URL".to_string()));
    }
    Ok(())
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest("Invalid date format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_pass() {
        for role in ["student", "organizer", "admin"] {
            assert!(validate_role(role).is_ok());
        }
        assert!(validate_role("superuser").is_err());
    }

    #[test]
    fn activity_statuses_are_closed_set() {
        for value in ["open", "closed", "cancelled", "completed"] {
            assert!(validate_activity_status(value).is_ok());
        }
        assert!(validate_activity_status("archived").is_err());
    }

    #[test]
    fn url_validation_accepts_http_and_https() {
        assert!(validate_url("https://example.com/poster.png").is_ok());
        assert!(validate_url("http://example.org").is_ok());
        assert!(validate_url("ftp://example.org/file").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn rfc3339_dates_parse_to_utc() {
        let parsed = parse_datetime("2025-01-30T10:00:00+07:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-01-30T03:00:00+00:00");
        assert!(parse_datetime("30/01/2025").is_err());
    }
}
