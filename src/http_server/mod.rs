//! # HTTP Server Module
//!
//! axum surface over the gateway. Every route is also mounted under
//! `/api/v1`.
//!
//! # Endpoints
//!
//! - `/ping` - Liveness
//! - `/allocate` - Create or register a database
//! - `/collections/:db` - Collection names
//! - `/detect-schema/:db/:collection` - Inferred schema
//! - `/entries/...`, `/entry/...` - Document CRUD

pub mod config;
pub mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use routes::{gateway_routes, TIMEOUT_HEADER};
pub use server::{HttpServer, API_PREFIX};
