//! Centralized error handling.
//!
//! Provides a unified error type for the whole core. Storage backends and the
//! asset store surface transport failures untouched; services and the saga
//! translate them into this taxonomy.

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("A record named '{0}' already exists")]
    DuplicateName(String),

    // Authorization
    #[error("Requester does not own this record")]
    OwnershipDenied,

    #[error("Role '{actual}' is not allowed, expected one of: {allowed:?}")]
    RoleDenied {
        actual: String,
        allowed: &'static [&'static str],
    },

    // Validation
    #[error("{0}")]
    Validation(String),

    // Saga failures
    #[error("Asset upload failed: {0}")]
    UploadFailed(String),

    // External service errors
    #[error("Persistence error")]
    Persistence(#[from] crate::infra::StoreError),

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    /// A secondary failure while rolling back a saga step. Always reported
    /// distinctly from the primary failure, never swallowed.
    #[error("Compensation failed after '{primary}': {compensation}")]
    CompensationFailed {
        primary: Box<AppError>,
        compensation: String,
    },

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get error code for callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::DuplicateName(_) => "DUPLICATE_NAME",
            AppError::OwnershipDenied => "UNAUTHORIZED_OWNERSHIP",
            AppError::RoleDenied { .. } => "UNAUTHORIZED_ROLE",
            AppError::Validation(_) => "VALIDATION_REJECTED",
            AppError::UploadFailed(_) => "UPLOAD_FAILED",
            AppError::Persistence(_) | AppError::Database(_) => "PERSISTENCE_FAILED",
            AppError::CompensationFailed { .. } => "COMPENSATION_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn duplicate(name: impl Into<String>) -> Self {
        AppError::DuplicateName(name.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        AppError::UploadFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
