//! Permissive write validation against a cached shape
//!
//! Validation semantics:
//! - Unknown paths are accepted and reported so the cache can be refreshed
//! - Optional and mixed paths accept any value
//! - A required, non-mixed path rejects a value of a conflicting type
//! - integer into float is compatible
//! - float into integer, and RFC 3339 strings into string, are accepted and
//!   reported since sampling would now merge the path differently
//! - an array whose element tag no longer merges into the cached `items` is
//!   accepted and reported
//!
//! Only the paths present in the incoming document are checked, so the same
//! rule serves full creates and partial updates. A full document that omits
//! a required path is still accepted; [`WriteValidator::omitted_required`]
//! reports those paths so the caller can refresh the cached optionality.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::inference::{observe_document, Observed};
use crate::storage::lookup_path;
use super::types::{FieldShape, SchemaShape, TypeTag};

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationDetails {
    /// Field path (e.g., "address.city")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value type or condition found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>, expected: TypeTag) -> Self {
        Self::new(field, format!("non-null {}", expected), "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Outcome of validating a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteVerdict {
    /// Every path matches the cached shape
    Accepted,
    /// Accepted; these paths are new or widen their cached type
    AcceptedWithNewField(Vec<String>),
    /// A required path received a conflicting type
    Rejected(ValidationDetails),
}

impl WriteVerdict {
    /// Whether the cached shape no longer describes the collection
    pub fn requires_refresh(&self) -> bool {
        matches!(self, WriteVerdict::AcceptedWithNewField(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, WriteVerdict::Rejected(_))
    }
}

enum PathCheck {
    Match,
    Drift,
    Conflict(ValidationDetails),
}

fn check_path(cached: &FieldShape, observed: &Observed) -> PathCheck {
    let path = observed.path.as_str();
    let expected = cached.type_tag;
    let actual = observed.tag;

    if actual == TypeTag::Null {
        return if !cached.is_enforced() || cached.nullable || expected == TypeTag::Null {
            PathCheck::Match
        } else {
            PathCheck::Conflict(ValidationDetails::null_value(path, expected))
        };
    }

    match (expected, actual) {
        (TypeTag::Array, TypeTag::Array) => check_items(cached.items, observed.items),
        (e, a) if e == a => PathCheck::Match,
        (TypeTag::Mixed, _) => PathCheck::Match,
        (TypeTag::Float, TypeTag::Integer) => PathCheck::Match,
        (TypeTag::String, TypeTag::Timestamp) => PathCheck::Drift,
        (TypeTag::Integer, TypeTag::Float) | (TypeTag::Null, _) => PathCheck::Drift,
        _ if !cached.is_enforced() => PathCheck::Drift,
        _ => PathCheck::Conflict(ValidationDetails::type_mismatch(
            path,
            expected.as_str(),
            actual.as_str(),
        )),
    }
}

/// Element tags drift when merging them would change the cached `items`
fn check_items(cached: Option<TypeTag>, actual: Option<TypeTag>) -> PathCheck {
    let cached = cached.unwrap_or(TypeTag::Unknown);
    let actual = actual.unwrap_or(TypeTag::Unknown);
    if cached.merge(actual) == cached {
        PathCheck::Match
    } else {
        PathCheck::Drift
    }
}

/// Validates writes against a cached `SchemaShape`
#[derive(Debug, Clone)]
pub struct WriteValidator {
    max_depth: usize,
}

impl WriteValidator {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    /// Validate the fields present in `fields` against `shape`.
    ///
    /// Paths are checked in sorted order so the reported conflict is stable.
    pub fn validate(&self, shape: &SchemaShape, fields: &Map<String, Value>) -> WriteVerdict {
        let mut observed = observe_document(fields, self.max_depth, None);
        observed.sort_by(|a, b| a.path.cmp(&b.path));

        let mut new_paths = Vec::new();
        for obs in observed {
            match shape.get(&obs.path) {
                None => new_paths.push(obs.path),
                Some(cached) => match check_path(cached, &obs) {
                    PathCheck::Match => {}
                    PathCheck::Drift => new_paths.push(obs.path),
                    PathCheck::Conflict(details) => return WriteVerdict::Rejected(details),
                },
            }
        }

        if new_paths.is_empty() {
            WriteVerdict::Accepted
        } else {
            WriteVerdict::AcceptedWithNewField(new_paths)
        }
    }

    /// Required paths of `shape` absent from a full document
    pub fn omitted_required(&self, shape: &SchemaShape, fields: &Map<String, Value>) -> Vec<String> {
        shape
            .iter()
            .filter(|(_, field)| !field.optional)
            .filter(|(path, _)| lookup_path(fields, path).is_none())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Required nested paths dropped by a partial update.
    ///
    /// The store replaces each top-level field of `patch` wholesale, so a
    /// nested required path is lost when its top-level parent is in the patch
    /// without it.
    pub fn omitted_in_patch(&self, shape: &SchemaShape, patch: &Map<String, Value>) -> Vec<String> {
        shape
            .iter()
            .filter(|(_, field)| !field.optional)
            .filter(|(path, _)| {
                path.split_once('.')
                    .is_some_and(|(top, _)| patch.contains_key(top))
            })
            .filter(|(path, _)| lookup_path(patch, path).is_none())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn orders_shape() -> SchemaShape {
        vec![
            ("item".to_string(), FieldShape::required(TypeTag::String)),
            ("qty".to_string(), FieldShape::required(TypeTag::Integer)),
            ("price".to_string(), FieldShape::required(TypeTag::Float)),
            ("note".to_string(), FieldShape::optional(TypeTag::String)),
            ("code".to_string(), FieldShape::required(TypeTag::Mixed)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_matching_write_is_accepted() {
        let verdict = WriteValidator::new(8).validate(
            &orders_shape(),
            &fields(json!({"item": "pen", "qty": 3, "price": 2})),
        );
        assert_eq!(verdict, WriteVerdict::Accepted);
    }

    #[test]
    fn test_omitted_required_paths() {
        let validator = WriteValidator::new(8);
        let omitted = validator.omitted_required(
            &orders_shape(),
            &fields(json!({"item": "pen", "price": 1.5})),
        );
        assert_eq!(omitted, vec!["code".to_string(), "qty".to_string()]);
    }

    #[test]
    fn test_omitted_in_patch_only_sees_replaced_subtrees() {
        let shape: SchemaShape = vec![
            ("item".to_string(), FieldShape::required(TypeTag::String)),
            ("address".to_string(), FieldShape::required(TypeTag::Object)),
            ("address.city".to_string(), FieldShape::required(TypeTag::String)),
            ("address.zip".to_string(), FieldShape::required(TypeTag::String)),
        ]
        .into_iter()
        .collect();
        let validator = WriteValidator::new(8);

        let omitted = validator.omitted_in_patch(&shape, &fields(json!({"item": "pen"})));
        assert!(omitted.is_empty());

        let omitted = validator
            .omitted_in_patch(&shape, &fields(json!({"address": {"zip": "0150"}})));
        assert_eq!(omitted, vec!["address.city".to_string()]);
    }

    #[test]
    fn test_unknown_field_requests_refresh() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"item": "pen", "colour": "red"})));
        assert_eq!(verdict, WriteVerdict::AcceptedWithNewField(vec!["colour".to_string()]));
        assert!(verdict.requires_refresh());
    }

    #[test]
    fn test_required_conflict_is_rejected() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"qty": "three"})));

        match verdict {
            WriteVerdict::Rejected(details) => {
                assert_eq!(details.field, "qty");
                assert_eq!(details.expected, "integer");
                assert_eq!(details.actual, "string");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_and_mixed_accept_anything() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"code": true})));
        assert_eq!(verdict, WriteVerdict::Accepted);

        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"note": 12})));
        assert_eq!(verdict, WriteVerdict::AcceptedWithNewField(vec!["note".to_string()]));
    }

    #[test]
    fn test_float_into_integer_widens() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"qty": 2.5})));
        assert_eq!(verdict, WriteVerdict::AcceptedWithNewField(vec!["qty".to_string()]));
    }

    #[test]
    fn test_array_element_drift() {
        let shape: SchemaShape = vec![
            ("tags".to_string(), FieldShape::array_of(TypeTag::String)),
            ("scores".to_string(), FieldShape::array_of(TypeTag::Float)),
            ("later".to_string(), FieldShape::array_of(TypeTag::Unknown)),
        ]
        .into_iter()
        .collect();
        let validator = WriteValidator::new(8);

        let verdict = validator.validate(&shape, &fields(json!({"tags": ["b"], "scores": [1], "later": []})));
        assert_eq!(verdict, WriteVerdict::Accepted);

        let verdict = validator.validate(&shape, &fields(json!({"tags": []})));
        assert_eq!(verdict, WriteVerdict::Accepted);

        let verdict = validator.validate(&shape, &fields(json!({"tags": [1], "later": [true]})));
        assert_eq!(
            verdict,
            WriteVerdict::AcceptedWithNewField(vec!["later".to_string(), "tags".to_string()])
        );
    }

    #[test]
    fn test_timestamp_into_string_drifts() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"item": "2024-01-01T00:00:00Z"})));
        assert_eq!(verdict, WriteVerdict::AcceptedWithNewField(vec!["item".to_string()]));
    }

    #[test]
    fn test_null_into_required_field_is_rejected() {
        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"item": null})));
        assert!(verdict.is_rejected());

        let verdict = WriteValidator::new(8)
            .validate(&orders_shape(), &fields(json!({"note": null})));
        assert_eq!(verdict, WriteVerdict::Accepted);
    }

    #[test]
    fn test_nested_new_path() {
        let shape: SchemaShape = vec![
            ("address".to_string(), FieldShape::required(TypeTag::Object)),
            ("address.city".to_string(), FieldShape::required(TypeTag::String)),
        ]
        .into_iter()
        .collect();

        let verdict = WriteValidator::new(8)
            .validate(&shape, &fields(json!({"address": {"city": "Oslo", "zip": "0150"}})));
        assert_eq!(verdict, WriteVerdict::AcceptedWithNewField(vec!["address.zip".to_string()]));

        let verdict = WriteValidator::new(8)
            .validate(&shape, &fields(json!({"address": {"city": 5}})));
        assert!(verdict.is_rejected());
    }

    #[test]
    fn test_empty_shape_accepts_everything_as_new() {
        let verdict = WriteValidator::new(8)
            .validate(&SchemaShape::new(), &fields(json!({"qty": 3, "item": "pen"})));
        assert_eq!(
            verdict,
            WriteVerdict::AcceptedWithNewField(vec!["item".to_string(), "qty".to_string()])
        );
    }
}
