//! Storage driver error types
//!
//! These are store-layer errors. They never leave the gateway raw: the
//! dispatcher and inference engine classify them into `GatewayError`.

use thiserror::Error;

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a `StorageDriver`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time
    #[error("store operation timed out")]
    Timeout,

    /// Name rejected by the store's naming rules
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// Database does not exist in the store
    #[error("database '{0}' does not exist")]
    DatabaseMissing(String),

    /// Collection does not exist in the database
    #[error("collection '{0}' does not exist")]
    CollectionMissing(String),

    /// Any other store failure
    #[error("store error: {0}")]
    Backend(String),
}

impl DriverError {
    /// Whether the failure is transient (worth a caller-side retry)
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::Unavailable(_) | DriverError::Timeout)
    }
}
