//! # Gateway Errors
//!
//! The error taxonomy every component reports in. Store-layer failures are
//! classified into these kinds at the dispatcher/inference boundary; no raw
//! store text reaches a response body.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ValidationDetails;
use crate::storage::DriverError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Stable error kind codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidName,
    StorageUnavailable,
    StorageTimeout,
    DatabaseNotFound,
    CollectionNotFound,
    NotFound,
    SchemaViolation,
    DuplicateName,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidName => "InvalidName",
            ErrorKind::StorageUnavailable => "StorageUnavailable",
            ErrorKind::StorageTimeout => "StorageTimeout",
            ErrorKind::DatabaseNotFound => "DatabaseNotFound",
            ErrorKind::CollectionNotFound => "CollectionNotFound",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::SchemaViolation => "SchemaViolation",
            ErrorKind::DuplicateName => "DuplicateName",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Name violates the store's naming rules
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Database was never allocated
    #[error("database '{0}' is not allocated")]
    DatabaseNotFound(String),

    /// Collection does not exist
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    /// Document id does not exist in the collection
    #[error("document '{0}' not found")]
    NotFound(String),

    /// Write conflicts with the inferred schema
    #[error("schema violation: {0}")]
    SchemaViolation(ValidationDetails),

    /// Allocation of an existing name while duplicates are rejected
    #[error("database '{0}' is already allocated")]
    DuplicateName(String),

    /// Malformed parameters or body
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ==================
    // Store Errors (5xx)
    // ==================
    /// Store unreachable
    #[error("storage is unavailable")]
    StorageUnavailable,

    /// Store did not answer before the caller's deadline
    #[error("storage did not respond before the deadline")]
    StorageTimeout,

    /// Unclassified failure; the detail is for logs only
    #[error("internal error")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidName { .. } => ErrorKind::InvalidName,
            GatewayError::DatabaseNotFound(_) => ErrorKind::DatabaseNotFound,
            GatewayError::CollectionNotFound(_) => ErrorKind::CollectionNotFound,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::SchemaViolation(_) => ErrorKind::SchemaViolation,
            GatewayError::DuplicateName(_) => ErrorKind::DuplicateName,
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::StorageUnavailable => ErrorKind::StorageUnavailable,
            GatewayError::StorageTimeout => ErrorKind::StorageTimeout,
            GatewayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Transient store failures are reported immediately, never retried here
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::StorageUnavailable | GatewayError::StorageTimeout
        )
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidName | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::DatabaseNotFound | ErrorKind::CollectionNotFound | ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorKind::DuplicateName => StatusCode::CONFLICT,
            ErrorKind::SchemaViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::StorageTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DriverError> for GatewayError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Unavailable(_) => GatewayError::StorageUnavailable,
            DriverError::Timeout => GatewayError::StorageTimeout,
            DriverError::InvalidName(name) => {
                GatewayError::invalid_name(name, "rejected by the store")
            }
            DriverError::DatabaseMissing(db) => GatewayError::DatabaseNotFound(db),
            DriverError::CollectionMissing(c) => GatewayError::CollectionNotFound(c),
            DriverError::Backend(detail) => GatewayError::Internal(detail),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}
