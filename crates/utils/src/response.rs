use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Envelope shared by every `/api` response.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ApiResponse<T, E = T> {
    success: bool,
    data: Option<T>,
    error_data: Option<E>,
    message: Option<String>,
}

impl<T, E> ApiResponse<T, E> {
    /// Creates a successful response, with `data` and no message.
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            error_data: None,
        }
    }

    /// Creates an error response, with `message` and no data.
    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error_data: None,
        }
    }

    /// Creates an error response with structured details and a message.
    pub fn error_with_data(message: &str, data: E) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error_data: Some(data),
            message: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn into_error_data(self) -> Option<E> {
        self.error_data
    }

    pub fn into_parts(self) -> (Option<T>, Option<E>, Option<String>) {
        (self.data, self.error_data, self.message)
    }
}

/// `error_data` of a 409: which field conflicts, and whether repeating the
/// request with `confirmed: true` would succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ConflictDetails {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub confirmation_required: bool,
}
