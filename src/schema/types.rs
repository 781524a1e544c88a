//! Schema shape types
//!
//! A `SchemaShape` maps dot-separated field paths to the type observed for
//! that path across a document sample. It describes observed structure,
//! not a constraint every writer is bound by.
//!
//! Type tags:
//! - string, integer, float, boolean, timestamp (RFC 3339 strings)
//! - array (with the element tag in `items`), object
//! - null (only nulls observed), mixed (irreconcilable observations)
//! - unknown (element tag of arrays that were always empty)

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inferred type of a field path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Array,
    Object,
    Null,
    Mixed,
    /// Only used as the element tag of arrays with no non-null element
    Unknown,
}

impl TypeTag {
    /// Tag of a single JSON value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    TypeTag::Integer
                } else {
                    TypeTag::Float
                }
            }
            Value::String(s) => {
                if DateTime::parse_from_rfc3339(s).is_ok() {
                    TypeTag::Timestamp
                } else {
                    TypeTag::String
                }
            }
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
        }
    }

    /// Element tag of an array: the tag of its first non-null element
    pub fn of_items(items: &[Value]) -> Self {
        items
            .iter()
            .find(|v| !v.is_null())
            .map(TypeTag::of)
            .unwrap_or(TypeTag::Unknown)
    }

    /// Merge two non-null observations of the same path.
    ///
    /// integer + float promotes to float; `unknown` yields to the other tag;
    /// every other disagreement is `mixed`.
    pub fn merge(self, other: TypeTag) -> TypeTag {
        match (self, other) {
            (a, b) if a == b => a,
            (TypeTag::Integer, TypeTag::Float) | (TypeTag::Float, TypeTag::Integer) => {
                TypeTag::Float
            }
            (TypeTag::Unknown, x) | (x, TypeTag::Unknown) => x,
            _ => TypeTag::Mixed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Null => "null",
            TypeTag::Mixed => "mixed",
            TypeTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inferred description of one field path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldShape {
    /// Merged type of all non-null observations
    #[serde(rename = "type")]
    pub type_tag: TypeTag,

    /// Absent from at least one sampled document
    pub optional: bool,

    /// `null` was observed alongside another type
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,

    /// Element tag, present only for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<TypeTag>,
}

impl FieldShape {
    pub fn required(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            optional: false,
            nullable: false,
            items: None,
        }
    }

    pub fn optional(type_tag: TypeTag) -> Self {
        Self {
            optional: true,
            ..Self::required(type_tag)
        }
    }

    pub fn array_of(items: TypeTag) -> Self {
        Self {
            items: Some(items),
            ..Self::required(TypeTag::Array)
        }
    }

    /// Whether writes must match this path's type
    pub fn is_enforced(&self) -> bool {
        !self.optional && self.type_tag != TypeTag::Mixed
    }
}

/// Field path -> inferred shape. Paths are unique by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaShape {
    fields: BTreeMap<String, FieldShape>,
}

impl SchemaShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&FieldShape> {
        self.fields.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldShape)> {
        self.fields.iter()
    }

    pub(crate) fn insert(&mut self, path: String, shape: FieldShape) {
        self.fields.insert(path, shape);
    }
}

impl FromIterator<(String, FieldShape)> for SchemaShape {
    fn from_iter<I: IntoIterator<Item = (String, FieldShape)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
