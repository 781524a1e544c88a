//! docgate - a multi-tenant data-access gateway with dynamic schema detection
//!
//! Callers allocate logical databases, then read and write schemaless
//! documents over HTTP. The gateway infers each collection's structure by
//! sampling and validates writes against it permissively.

pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod gateway;
pub mod http_server;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod storage;

pub use config::GatewayConfig;
pub use context::RequestContext;
pub use errors::{ErrorKind, GatewayError, GatewayResult};
pub use gateway::Gateway;
