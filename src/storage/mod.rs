//! Storage Driver Adapter
//!
//! The capability interface the gateway consumes, plus a process-local
//! implementation used by the binary and the tests.

mod driver;
mod errors;
mod filter;
mod memory;

pub use driver::{RawDocument, StorageDriver};
pub use errors::{DriverError, DriverResult};
pub use filter::{lookup_path, FilterExpr, FilterOperator, FilterSet};
pub use memory::{MemoryDriver, MEMORY_ID_FIELD};
