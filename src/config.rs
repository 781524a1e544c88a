//! Gateway configuration
//!
//! Loaded from an optional JSON file with per-field defaults, then
//! overridden by the environment (`HOST`, `PORT`) and finally by CLI flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::observability::Severity;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Schema detection bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Documents sampled when the caller gives no size (default: 100)
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Largest sample a caller may request (default: 1000)
    #[serde(default = "default_max_sample_size")]
    pub max_sample_size: usize,

    /// Nesting depth beyond which objects are opaque (default: 8)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Cached shapes older than this are re-detected (default: never)
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

fn default_sample_size() -> usize {
    100
}

fn default_max_sample_size() -> usize {
    1000
}

fn default_max_depth() -> usize {
    crate::schema::DEFAULT_MAX_DEPTH
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            max_sample_size: default_max_sample_size(),
            max_depth: default_max_depth(),
            cache_ttl_secs: None,
        }
    }
}

impl SchemaConfig {
    pub fn cache_ttl(&self) -> Option<chrono::Duration> {
        self.cache_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

/// Database allocation policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Fail allocation of an already-allocated name (default: false)
    #[serde(default)]
    pub reject_duplicates: bool,
}

/// Top-level gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    /// Default per-request deadline (default: 5000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            schema: SchemaConfig::default(),
            allocator: AllocatorConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config: GatewayConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise start from defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply `HOST` and `PORT` from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(std::env::var("HOST").ok(), std::env::var("PORT").ok())
    }

    /// Apply host/port overrides given as raw strings
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("port", format!("'{}' is not a port", port)))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be > 0"));
        }
        if self.schema.sample_size == 0 {
            return Err(ConfigError::invalid("schema.sample_size", "must be >= 1"));
        }
        if self.schema.max_sample_size < self.schema.sample_size {
            return Err(ConfigError::invalid(
                "schema.max_sample_size",
                "must be >= schema.sample_size",
            ));
        }
        if self.schema.max_depth == 0 {
            return Err(ConfigError::invalid("schema.max_depth", "must be >= 1"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("request_timeout_ms", "must be >= 1"));
        }
        self.severity()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::invalid("log_level", format!("unknown level '{}'", self.log_level)))
    }
}
