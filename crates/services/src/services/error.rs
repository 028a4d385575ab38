use thiserror::Error;
use utils::validation::FieldErrors;

/// Failure of a CRUD or workflow operation, mapped to HTTP by the server.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Conflict { field: String, message: String },
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("changing status from {from} to {to} requires confirmation")]
    ConfirmationRequired { from: String, to: String },
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl ServiceError {
    pub fn conflict(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(FieldErrors::single(field, message))
    }
}
