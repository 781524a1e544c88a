//! # List Parameter Parser
//!
//! Parses `/entries` query parameters into a structured listing request.
//!
//! ```text
//! ?select=sku,qty&limit=20&offset=40&qty=gte.2&status=in.(new,paid)
//! ```
//!
//! Every key other than `select`, `limit` and `offset` is a field filter of
//! the form `field=op.value`; a value without a known operator prefix is an
//! equality match on the whole value.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::{GatewayError, GatewayResult};
use crate::storage::{FilterExpr, FilterOperator};

/// Maximum number of documents in one page
pub const MAX_LIMIT: usize = 1000;

/// Page size if not specified
pub const DEFAULT_LIMIT: usize = 100;

/// Parsed listing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    /// Fields to return (None = whole document)
    pub select: Option<Vec<String>>,

    /// Filter expressions, all of which must match
    pub filters: Vec<FilterExpr>,

    /// Page size
    pub limit: usize,

    /// Documents to skip
    pub offset: usize,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            select: None,
            filters: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListParams {
    /// Parse query parameters from a HashMap
    pub fn parse(params: &HashMap<String, String>) -> GatewayResult<Self> {
        let mut result = ListParams::default();

        for (key, value) in params {
            match key.as_str() {
                "select" => result.select = parse_select(value)?,
                "limit" => result.limit = parse_limit(value)?,
                "offset" => result.offset = parse_offset(value)?,
                _ => result.filters.push(parse_filter(key, value)?),
            }
        }

        // Deterministic order regardless of map iteration
        result.filters.sort_by(|a, b| a.field.cmp(&b.field));
        Ok(result)
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Parse select parameter (comma-separated field list, `*` for all)
fn parse_select(value: &str) -> GatewayResult<Option<Vec<String>>> {
    if value.trim() == "*" {
        return Ok(None);
    }

    let fields: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if fields.is_empty() {
        return Err(GatewayError::invalid_request("select cannot be empty"));
    }

    Ok(Some(fields))
}

/// Parse limit parameter
fn parse_limit(value: &str) -> GatewayResult<usize> {
    let limit: usize = value
        .parse()
        .map_err(|_| GatewayError::invalid_request(format!("invalid limit: {}", value)))?;
    if limit == 0 || limit > MAX_LIMIT {
        return Err(GatewayError::invalid_request(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }
    Ok(limit)
}

/// Parse offset parameter
fn parse_offset(value: &str) -> GatewayResult<usize> {
    value
        .parse()
        .map_err(|_| GatewayError::invalid_request(format!("invalid offset: {}", value)))
}

/// Parse a filter expression from key=value
fn parse_filter(field: &str, value: &str) -> GatewayResult<FilterExpr> {
    if field.is_empty() {
        return Err(GatewayError::invalid_request("filter field cannot be empty"));
    }

    let (operator, raw) = match value.split_once('.') {
        Some((op, rest)) => match FilterOperator::parse(op) {
            Some(op) => (op, rest),
            None => (FilterOperator::Eq, value),
        },
        None => (FilterOperator::Eq, value),
    };

    let parsed = parse_filter_value(raw);
    if operator == FilterOperator::In && !parsed.is_array() {
        return Err(GatewayError::invalid_request(format!(
            "'in' filter on '{}' needs a list like (a,b)",
            field
        )));
    }

    Ok(FilterExpr::new(field, operator, parsed))
}

/// Parse a filter value (handles lists for the `in` operator)
fn parse_filter_value(value: &str) -> Value {
    if let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        let items = inner
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(parse_scalar)
            .collect();
        return Value::Array(items);
    }
    parse_scalar(value)
}

fn parse_scalar(value: &str) -> Value {
    match value {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(value.to_string())
}
