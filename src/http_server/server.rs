//! # HTTP Server
//!
//! Serves the gateway routes at the root and under `/api/v1`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::config::HttpServerConfig;
use super::routes::gateway_routes;
use crate::gateway::Gateway;
use crate::observability::{Logger, ObservationScope};

/// Prefix of the versioned alias
pub const API_PREFIX: &str = "/api/v1";

/// HTTP server for the gateway
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(gateway: Arc<Gateway>, config: HttpServerConfig) -> Self {
        let router = Self::build_router(gateway, &config);
        Self { config, router }
    }

    /// Build the combined router with all endpoints
    fn build_router(gateway: Arc<Gateway>, config: &HttpServerConfig) -> Router {
        let methods = [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ];
        let headers = [
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ];

        let origin_policy = if config.cors_origins.is_empty() {
            // No origins configured: permissive for development
            AllowOrigin::from(Any)
        } else {
            let origins: Vec<HeaderValue> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();
            AllowOrigin::list(origins)
        };
        let cors = CorsLayer::new()
            .allow_origin(origin_policy)
            .allow_methods(methods)
            .allow_headers(headers);

        Router::new()
            .merge(gateway_routes(gateway.clone()))
            .nest(API_PREFIX, gateway_routes(gateway))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> io::Result<()> {
        let scope = ObservationScope::new("HTTP_BIND");
        let addr: SocketAddr = match self.config.socket_addr().parse() {
            Ok(addr) => addr,
            Err(e) => {
                scope.fail("invalid socket address");
                return Err(io::Error::new(io::ErrorKind::InvalidInput, e));
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e);
            }
        };
        scope.complete();

        let addr_str = addr.to_string();
        Logger::info(
            "SERVER_LISTENING",
            &[("addr", &addr_str), ("api_prefix", API_PREFIX)],
        );

        axum::serve(listener, self.router).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::storage::MemoryDriver;

    fn gateway() -> Arc<Gateway> {
        Arc::new(Gateway::new(
            Arc::new(MemoryDriver::new()),
            GatewayConfig::default(),
        ))
    }

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new(gateway(), HttpServerConfig::default());
        assert_eq!(server.socket_addr(), "0.0.0.0:9081");
    }

    #[test]
    fn test_server_with_custom_port() {
        let server = HttpServer::new(gateway(), HttpServerConfig::with_port(8080));
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds_without_origins() {
        let config = HttpServerConfig {
            cors_origins: Vec::new(),
            ..Default::default()
        };
        let _router = HttpServer::new(gateway(), config).router();
    }
}
