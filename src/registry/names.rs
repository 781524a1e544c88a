//! Naming rules for databases and collections
//!
//! Rules follow the common document-store conventions:
//! - database: 1..=63 bytes, none of `/\. "$*<>:|?`, no whitespace or NUL
//! - collection: 1..=120 bytes, no `$` or NUL, not `system.`-prefixed

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{GatewayError, GatewayResult};

const MAX_DATABASE_NAME_BYTES: usize = 63;
const MAX_COLLECTION_NAME_BYTES: usize = 120;

/// Compiled once; a compile failure is reported on every validation
fn database_name_pattern() -> GatewayResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"^[^/\\. "$*<>:|?\s\x00]+$"#))
        .as_ref()
        .map_err(|e| GatewayError::Internal(format!("invalid database name pattern: {}", e)))
}

/// Validate a database name
pub fn validate_database_name(name: &str) -> GatewayResult<()> {
    if name.is_empty() {
        return Err(GatewayError::invalid_name(name, "name cannot be empty"));
    }
    if name.len() > MAX_DATABASE_NAME_BYTES {
        return Err(GatewayError::invalid_name(
            name,
            format!("name exceeds {} bytes", MAX_DATABASE_NAME_BYTES),
        ));
    }
    let pattern = database_name_pattern()?;
    if !pattern.is_match(name) {
        return Err(GatewayError::invalid_name(
            name,
            "name contains a forbidden character",
        ));
    }
    Ok(())
}

/// Validate a collection name
pub fn validate_collection_name(name: &str) -> GatewayResult<()> {
    if name.is_empty() {
        return Err(GatewayError::invalid_name(name, "name cannot be empty"));
    }
    if name.len() > MAX_COLLECTION_NAME_BYTES {
        return Err(GatewayError::invalid_name(
            name,
            format!("name exceeds {} bytes", MAX_COLLECTION_NAME_BYTES),
        ));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(GatewayError::invalid_name(
            name,
            "name contains a forbidden character",
        ));
    }
    if name.starts_with("system.") {
        return Err(GatewayError::invalid_name(name, "'system.' prefix is reserved"));
    }
    Ok(())
}
