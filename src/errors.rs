//! Unified error type for `ClassCredits`.
//!
//! Every core operation returns [`Result`]. The HTTP layer maps each variant to a
//! status code in `api::error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Insufficient credits: {remaining} remaining, {required} required")]
    InsufficientCredits { remaining: i32, required: i32 },

    #[error("No usable credits for student {student_id} in course {course_id}")]
    NoUsableCredits { student_id: i64, course_id: i64 },

    #[error("Credit {credit_id} has expired")]
    CreditExpired { credit_id: i64 },

    #[error("Quota exceeded: {resource} limit of {limit} reached")]
    QuotaExceeded { resource: &'static str, limit: i32 },

    #[error("Feature not enabled for this school: {feature}")]
    FeatureDisabled { feature: &'static str },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("School deletion stopped at `{table}` after removing {deleted_rows} rows: {source}")]
    PartialDeletion {
        table: &'static str,
        deleted_rows: u64,
        source: sea_orm::DbErr,
    },
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] keyed by a numeric id.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a [`Error::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
