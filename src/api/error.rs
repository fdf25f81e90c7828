//! HTTP mapping of [`Error`].

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl Error {
    /// Stable machine-readable code sent to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration_error",
            Self::Database(_) => "database_error",
            Self::Io(_) => "internal_error",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_failed",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::NoUsableCredits { .. } => "no_usable_credits",
            Self::CreditExpired { .. } => "credit_expired",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::FeatureDisabled { .. } => "feature_disabled",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Conflict { .. } => "conflict",
            Self::PartialDeletion { .. } => "partial_deletion",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } | Self::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
            Self::InsufficientCredits { .. }
            | Self::NoUsableCredits { .. }
            | Self::CreditExpired { .. }
            | Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::QuotaExceeded { .. } | Self::FeatureDisabled { .. } | Self::Forbidden { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::PartialDeletion { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code, %message, error = ?self, "Server error");
        } else {
            tracing::warn!(code, %message, "Client error");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}
