use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;

/// The structured payload encoded into an event's QR code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub event_id: Uuid,
    pub code: Option<String>,
}

pub fn parse_payload(raw: &str) -> Result<QrPayload, AppError> {
    serde_json::from_str(raw).map_err(|_| AppError::BadRequest("Invalid QR payload".to_string()))
}

/// Random code embedded in an event's QR at creation time.
pub fn generate_check_in_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_payload_parses() {
        let event_id = Uuid::new_v4();
        let raw = format!(r#"{{"eventId":"{}","code":"a1B2c3D4e5"}}"#, event_id);
        let payload = parse_payload(&raw).unwrap();
        assert_eq!(payload.event_id, event_id);
        assert_eq!(payload.code.as_deref(), Some("a1B2c3D4e5"));
    }

    #[test]
    fn code_is_optional() {
        let raw = format!(r#"{{"eventId":"{}"}}"#, Uuid::new_v4());
        assert!(parse_payload(&raw).unwrap().code.is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_payload("not json").is_err());
        assert!(parse_payload(r#"{"code":"x"}"#).is_err());
    }

    #[test]
    fn generated_codes_are_alphanumeric() {
        let code = generate_check_in_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
