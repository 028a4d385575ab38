use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use services::services::{
    database_maintenance::MaintenanceError,
    error::ServiceError,
    file_storage::FileStorageError,
    woocommerce::WooCommerceServiceError,
};
use thiserror::Error;
use tracing::error;
use utils::{
    response::{ApiResponse, ConflictDetails},
    validation::FieldErrors,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Files(#[from] FileStorageError),
    #[error(transparent)]
    WooCommerce(#[from] WooCommerceServiceError),
    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
}

impl ApiError {
    pub fn invalid(field: &str, message: &str) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }
}

/// Status, message and optional `error_data` for the envelope
struct ErrorBody {
    status: StatusCode,
    message: String,
    data: Option<Value>,
}

impl ErrorBody {
    fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(status: StatusCode, message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            status,
            message: message.into(),
            data: serde_json::to_value(data).ok(),
        }
    }

    fn validation(errors: &FieldErrors) -> Self {
        Self::with_data(StatusCode::BAD_REQUEST, "Validation failed", errors)
    }

    fn conflict(field: &str, message: &str, confirmation_required: bool) -> Self {
        Self::with_data(
            StatusCode::CONFLICT,
            message,
            ConflictDetails {
                field: field.to_string(),
                message: message.to_string(),
                confirmation_required,
            },
        )
    }

    fn internal(err: &dyn std::error::Error) -> Self {
        error!(error = %err, "Request failed");
        Self::plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => ErrorBody::internal(e),
            ServiceError::Validation(errors) => ErrorBody::validation(errors),
            ServiceError::NotFound(_) => ErrorBody::plain(StatusCode::NOT_FOUND, err.to_string()),
            ServiceError::Conflict { field, message } => ErrorBody::conflict(field, message, false),
            ServiceError::InvalidTransition { .. } => ErrorBody::conflict("status", &err.to_string(), false),
            ServiceError::ConfirmationRequired { .. } => ErrorBody::conflict("status", &err.to_string(), true),
        }
    }
}

impl From<&FileStorageError> for ErrorBody {
    fn from(err: &FileStorageError) -> Self {
        match err {
            FileStorageError::TooLarge { .. } => ErrorBody::plain(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
            FileStorageError::Empty => ErrorBody::validation(&FieldErrors::single("file", "is empty")),
            FileStorageError::NotFound => ErrorBody::plain(StatusCode::NOT_FOUND, err.to_string()),
            FileStorageError::Validation(errors) => ErrorBody::validation(errors),
            FileStorageError::Io(e) => ErrorBody::internal(e),
            FileStorageError::Database(e) => ErrorBody::internal(e),
        }
    }
}

impl From<&WooCommerceServiceError> for ErrorBody {
    fn from(err: &WooCommerceServiceError) -> Self {
        match err {
            WooCommerceServiceError::NotConfigured => ErrorBody::conflict("settings", &err.to_string(), false),
            WooCommerceServiceError::Disabled => ErrorBody::conflict("enabled", &err.to_string(), false),
            WooCommerceServiceError::Validation(errors) => ErrorBody::validation(errors),
            WooCommerceServiceError::NothingToExport => {
                ErrorBody::validation(&FieldErrors::single("product_ids", "no products to export"))
            }
            WooCommerceServiceError::Upstream(e) => {
                error!(error = %e, "WooCommerce request failed");
                ErrorBody::plain(StatusCode::BAD_GATEWAY, format!("WooCommerce: {}", e))
            }
            WooCommerceServiceError::Database(e) => ErrorBody::internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Service(e) => ErrorBody::from(e),
            ApiError::Files(e) => ErrorBody::from(e),
            ApiError::WooCommerce(e) => ErrorBody::from(e),
            ApiError::Maintenance(MaintenanceError::Files(e)) => ErrorBody::from(e),
            ApiError::Maintenance(MaintenanceError::Database(e)) => ErrorBody::internal(e),
            ApiError::Database(e) => ErrorBody::internal(e),
            ApiError::Multipart(e) => ErrorBody::plain(e.status(), e.body_text()),
            ApiError::Validation(errors) => ErrorBody::validation(errors),
        };

        let envelope = match body.data {
            Some(data) => ApiResponse::<(), Value>::error_with_data(&body.message, data),
            None => ApiResponse::<(), Value>::error(&body.message),
        };
        (body.status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_carry_fields() {
        let (status, body) = render(ServiceError::invalid("email", "must be a valid email address").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error_data"]["email"], "must be a valid email address");
    }

    #[tokio::test]
    async fn confirmation_is_a_flagged_conflict() {
        let err = ServiceError::ConfirmationRequired {
            from: "sent".to_string(),
            to: "cancelled".to_string(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error_data"]["field"], "status");
        assert_eq!(body["error_data"]["confirmation_required"], true);
    }

    #[tokio::test]
    async fn upload_limit_is_413() {
        let (status, _) = render(FileStorageError::TooLarge { size: 11, limit: 10 }.into()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = render(sqlx::Error::RowNotFound.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
