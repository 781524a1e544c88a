//! Observability for docgate
//!
//! - Structured logging (one JSON object per line)
//! - Scope-based BEGIN/COMPLETE events for long-running work
//!
//! # Usage
//!
//! ```ignore
//! use docgate::observability::{Logger, ObservationScope};
//!
//! Logger::info("ENTRY_CREATED", &[("db", "shop"), ("collection", "orders")]);
//!
//! let scope = ObservationScope::new("SCHEMA_DETECT");
//! // ... do work ...
//! scope.complete();
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};
