//! Request Context
//!
//! Context carried through every gateway operation: a request id for log
//! correlation and the caller's deadline. All store-facing calls go through
//! [`RequestContext::run`], which enforces the deadline and classifies
//! driver errors.

use std::future::Future;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::errors::{GatewayError, GatewayResult};
use crate::observability::Logger;
use crate::storage::DriverResult;

/// Default budget for a request when the caller gives none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Context carried through a single logical request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Point in time after which store calls are abandoned
    deadline: Instant,

    /// Start time for duration tracking
    started_at: Instant,
}

impl RequestContext {
    /// Create a context whose deadline is `timeout` from now
    pub fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            request_id: Uuid::new_v4(),
            deadline: now + timeout,
            started_at: now,
        }
    }

    /// Create a context with an absolute deadline
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline,
            started_at: Instant::now(),
        }
    }

    /// Time left before the deadline; `None` once it has passed
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Run one store call under this context's deadline.
    ///
    /// An expired deadline fails with `StorageTimeout` without calling the
    /// store. Driver errors are classified; their raw text is logged here
    /// and nowhere else.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> GatewayResult<T>
    where
        F: Future<Output = DriverResult<T>>,
    {
        let Some(budget) = self.remaining() else {
            self.log_store_failure(operation, "deadline expired before call");
            return Err(GatewayError::StorageTimeout);
        };

        match tokio::time::timeout(budget, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                self.log_store_failure(operation, &err.to_string());
                Err(GatewayError::from(err))
            }
            Err(_) => {
                self.log_store_failure(operation, "deadline elapsed");
                Err(GatewayError::StorageTimeout)
            }
        }
    }

    fn log_store_failure(&self, operation: &str, detail: &str) {
        let request_id = self.request_id.to_string();
        Logger::warn(
            "STORE_CALL_FAILED",
            &[
                ("detail", detail),
                ("operation", operation),
                ("request_id", &request_id),
            ],
        );
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
