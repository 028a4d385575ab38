use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use utils::{response::ConflictDetails, validation::FieldErrors};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("{field}: {message}")]
    Conflict { field: String, message: String },
    /// Repeat the request with `confirmed: true` once the user agreed
    #[error("confirmation required: {message}")]
    ConfirmationRequired { field: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no create or edit form is open")]
    NoOpenForm,
}

impl ClientError {
    /// Maps a non-2xx envelope onto the error the caller can act on.
    pub(crate) fn from_envelope(status: StatusCode, error_data: Option<Value>, message: Option<String>) -> Self {
        let message = message.unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        match status {
            StatusCode::BAD_REQUEST => match error_data.map(serde_json::from_value::<FieldErrors>) {
                Some(Ok(errors)) if !errors.is_empty() => ClientError::Validation(errors),
                _ => ClientError::Http {
                    status: status.as_u16(),
                    message,
                },
            },
            StatusCode::CONFLICT => match error_data.map(serde_json::from_value::<ConflictDetails>) {
                Some(Ok(details)) if details.confirmation_required => ClientError::ConfirmationRequired {
                    field: details.field,
                    message: details.message,
                },
                Some(Ok(details)) => ClientError::Conflict {
                    field: details.field,
                    message: details.message,
                },
                _ => ClientError::Conflict {
                    field: String::new(),
                    message,
                },
            },
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Http {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Field errors to show next to form inputs, if this error has any.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            ClientError::Validation(errors) => Some(errors.clone()),
            ClientError::Conflict { field, message } if !field.is_empty() => {
                Some(FieldErrors::single(field.clone(), message.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bad_request_with_field_errors_is_validation() {
        let err = ClientError::from_envelope(
            StatusCode::BAD_REQUEST,
            Some(json!({ "name": "is required" })),
            Some("Validation failed".to_string()),
        );
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("name"), Some("is required"));
    }

    #[test]
    fn conflict_distinguishes_confirmation() {
        let err = ClientError::from_envelope(
            StatusCode::CONFLICT,
            Some(json!({ "field": "status", "message": "cancelling needs confirmation", "confirmation_required": true })),
            None,
        );
        assert!(matches!(err, ClientError::ConfirmationRequired { ref field, .. } if field == "status"));

        let err = ClientError::from_envelope(
            StatusCode::CONFLICT,
            Some(json!({ "field": "email", "message": "already in use" })),
            None,
        );
        assert_eq!(err.field_errors().unwrap().get("email"), Some("already in use"));
    }

    #[test]
    fn other_statuses_keep_the_message() {
        let err = ClientError::from_envelope(StatusCode::BAD_GATEWAY, None, Some("store unreachable".to_string()));
        assert!(matches!(err, ClientError::Http { status: 502, ref message } if message == "store unreachable"));
        let err = ClientError::from_envelope(StatusCode::NOT_FOUND, None, None);
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Not Found"));
    }
}
