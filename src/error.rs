// src/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input, including duplicate unique keys.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A business rule forbids the operation in the current state.
    #[error("{0}")]
    Conflict(String),

    /// An outbound call (identity provider) failed.
    #[error("remote call failed: {0}")]
    Remote(String),

    /// A multi-step external write stopped after its first step.
    #[error("{0}")]
    PartialFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Remote(_) => "remote",
            AppError::PartialFailure(_) => "partial_failure",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Remote(_) | AppError::PartialFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Duplicate(field) => AppError::Validation(format!("{field} already exists")),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        }
        let body = json!({
            "success": false,
            "error": { "kind": self.kind(), "message": self.to_string() },
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let dup: AppError = StoreError::Duplicate("bed_number".into()).into();
        assert!(matches!(dup, AppError::Validation(ref m) if m == "bed_number already exists"));

        let conflict: AppError = StoreError::Conflict("bed not available".into()).into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing: AppError = StoreError::NotFound("admission".into()).into();
        assert_eq!(missing.to_string(), "admission not found");

        let db: AppError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(db.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
