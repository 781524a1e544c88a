//! # Filter Expression AST
//!
//! Simple field filters pushed down to the storage driver. Field names may
//! be dot-separated paths into nested objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Pattern match (`%` any run, `_` any single char)
    Like,
    /// Value in list
    In,
    /// Is null / not null
    Is,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
            FilterOperator::In => "in",
            FilterOperator::Is => "is",
        }
    }

    /// Parse an operator prefix such as `gt`
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "eq" => Some(FilterOperator::Eq),
            "neq" => Some(FilterOperator::Neq),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "like" => Some(FilterOperator::Like),
            "in" => Some(FilterOperator::In),
            "is" => Some(FilterOperator::Is),
            _ => None,
        }
    }
}

/// A filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field path to filter on
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    /// Create a new filter expression
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a greater than filter
    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Gt, value)
    }

    /// Create an "in list" filter
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Check if a document matches this filter
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        let field_value = match lookup_path(doc, &self.field) {
            Some(v) => v,
            None => return self.operator == FilterOperator::Is && self.value.is_null(),
        };

        match self.operator {
            FilterOperator::Eq => loosely_equal(field_value, &self.value),
            FilterOperator::Neq => !loosely_equal(field_value, &self.value),
            FilterOperator::Gt => compare_json_values(field_value, &self.value) == Some(1),
            FilterOperator::Gte => matches!(compare_json_values(field_value, &self.value), Some(0 | 1)),
            FilterOperator::Lt => compare_json_values(field_value, &self.value) == Some(-1),
            FilterOperator::Lte => matches!(compare_json_values(field_value, &self.value), Some(-1 | 0)),
            FilterOperator::Like => match (field_value.as_str(), self.value.as_str()) {
                (Some(field_str), Some(pattern)) => matches_like_pattern(field_str, pattern),
                _ => false,
            },
            FilterOperator::In => match self.value.as_array() {
                Some(arr) => arr.iter().any(|candidate| loosely_equal(field_value, candidate)),
                None => false,
            },
            FilterOperator::Is => {
                if self.value.is_null() {
                    field_value.is_null()
                } else {
                    !field_value.is_null()
                }
            }
        }
    }
}

/// Resolve a dot-separated path inside a document.
///
/// An exact top-level key wins over path traversal, so a field literally
/// named `a.b` is still reachable.
pub fn lookup_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(v) = doc.get(path) {
        return Some(v);
    }

    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Equality that tolerates query-string typing: `"3"` in a filter matches a
/// stored string `"3"`, and `3` matches both `3` and `3.0`.
fn loosely_equal(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::Number(b)) => a == &b.to_string(),
        (Value::String(a), Value::Bool(b)) => a == &b.to_string(),
        _ => stored == wanted,
    }
}

/// Compare two JSON values for ordering; `None` when not comparable
fn compare_json_values(a: &Value, b: &Value) -> Option<i8> {
    let ordering = match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?)?,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => return None,
    };
    Some(ordering as i8)
}

/// SQL LIKE matching: `%` any sequence, `_` a single char
fn matches_like_pattern(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // dp[j]: pattern[..i] matches value[..j]
    let mut dp = vec![false; value.len() + 1];
    dp[0] = true;

    for p in &pattern {
        let mut next = vec![false; value.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=value.len() {
                    seen = seen || dp[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=value.len() {
                    next[j] = dp[j - 1] && (*p == '_' || *p == value[j - 1]);
                }
            }
        }
        dp = next;
    }

    dp[value.len()]
}

/// A set of filters combined with AND logic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub filters: Vec<FilterExpr>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Check if a document matches all filters
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_eq_filter() {
        let filter = FilterExpr::eq("item", json!("pen"));

        assert!(filter.matches(&doc(json!({"item": "pen"}))));
        assert!(!filter.matches(&doc(json!({"item": "ink"}))));
        assert!(!filter.matches(&doc(json!({"qty": 3}))));
    }

    #[test]
    fn test_gt_filter_ignores_incomparable() {
        let filter = FilterExpr::gt("qty", json!(2));

        assert!(filter.matches(&doc(json!({"qty": 3}))));
        assert!(filter.matches(&doc(json!({"qty": 2.5}))));
        assert!(!filter.matches(&doc(json!({"qty": 2}))));
        assert!(!filter.matches(&doc(json!({"qty": "many"}))));
    }

    #[test]
    fn test_in_filter() {
        let filter = FilterExpr::in_list("status", vec![json!("open"), json!("held")]);

        assert!(filter.matches(&doc(json!({"status": "open"}))));
        assert!(!filter.matches(&doc(json!({"status": "closed"}))));
    }

    #[test]
    fn test_like_filter() {
        let filter = FilterExpr::new("name", FilterOperator::Like, json!("%son"));

        assert!(filter.matches(&doc(json!({"name": "Johnson"}))));
        assert!(!filter.matches(&doc(json!({"name": "Smith"}))));

        let single = FilterExpr::new("code", FilterOperator::Like, json!("A_C"));
        assert!(single.matches(&doc(json!({"code": "ABC"}))));
        assert!(!single.matches(&doc(json!({"code": "ABBC"}))));
    }

    #[test]
    fn test_nested_path() {
        let filter = FilterExpr::eq("address.city", json!("Oslo"));

        assert!(filter.matches(&doc(json!({"address": {"city": "Oslo"}}))));
        assert!(!filter.matches(&doc(json!({"address": "Oslo"}))));
    }

    #[test]
    fn test_is_null_matches_missing() {
        let filter = FilterExpr::new("deleted_at", FilterOperator::Is, Value::Null);

        assert!(filter.matches(&doc(json!({"name": "a"}))));
        assert!(filter.matches(&doc(json!({"deleted_at": null}))));
        assert!(!filter.matches(&doc(json!({"deleted_at": "2024-01-01"}))));
    }

    #[test]
    fn test_string_id_matches_numeric_filter() {
        let filter = FilterExpr::eq("_id", json!(1));
        assert!(filter.matches(&doc(json!({"_id": "1"}))));
    }

    #[test]
    fn test_filter_set() {
        let filters = FilterSet::new()
            .and(FilterExpr::eq("item", json!("pen")))
            .and(FilterExpr::gt("qty", json!(1)));

        assert!(filters.matches(&doc(json!({"item": "pen", "qty": 3}))));
        assert!(!filters.matches(&doc(json!({"item": "pen", "qty": 1}))));
    }
}
