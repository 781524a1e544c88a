//! Shape inference over a document sample
//!
//! Each document is walked recursively up to `max_depth`; every field path
//! contributes one observation per document. Observations merge as:
//!
//! - present in every document, one type -> required field of that type
//! - missing from some document -> optional
//! - integer and float -> float
//! - any other pair of distinct non-null types -> mixed
//! - objects at `max_depth` are recorded as opaque `object` leaves

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::types::{FieldShape, SchemaShape, TypeTag};

/// Default upper bound on nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// One field path as seen in one document
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Observed {
    pub path: String,
    pub tag: TypeTag,
    pub items: Option<TypeTag>,
}

/// Collect every field path of a document with its observed tag.
///
/// Paths are dot-separated. Top-level fields are at depth 1; an object at
/// `max_depth` is reported but not descended into.
pub(crate) fn observe_document(
    doc: &Map<String, Value>,
    max_depth: usize,
    skip_field: Option<&str>,
) -> Vec<Observed> {
    let mut out = Vec::new();
    for (key, value) in doc {
        if Some(key.as_str()) == skip_field {
            continue;
        }
        walk(key.clone(), value, 1, max_depth, &mut out);
    }
    out
}

fn walk(path: String, value: &Value, depth: usize, max_depth: usize, out: &mut Vec<Observed>) {
    let tag = TypeTag::of(value);
    let items = match value {
        Value::Array(elements) => Some(TypeTag::of_items(elements)),
        _ => None,
    };

    if let Value::Object(children) = value {
        if depth < max_depth {
            for (key, child) in children {
                walk(format!("{}.{}", path, key), child, depth + 1, max_depth, out);
            }
        }
    }

    out.push(Observed { path, tag, items });
}

#[derive(Debug, Default)]
struct Accumulator {
    seen_in: usize,
    tag: Option<TypeTag>,
    saw_null: bool,
    items: Option<TypeTag>,
}

impl Accumulator {
    fn observe(&mut self, observed: &Observed) {
        self.seen_in += 1;

        if observed.tag == TypeTag::Null {
            self.saw_null = true;
            return;
        }

        self.tag = Some(match self.tag {
            Some(prev) => prev.merge(observed.tag),
            None => observed.tag,
        });

        if let Some(items) = observed.items {
            self.items = Some(match self.items {
                Some(prev) => prev.merge(items),
                None => items,
            });
        }
    }

    fn finish(self, sampled: usize) -> FieldShape {
        let type_tag = self.tag.unwrap_or(TypeTag::Null);
        FieldShape {
            type_tag,
            optional: self.seen_in < sampled,
            nullable: self.saw_null && type_tag != TypeTag::Null,
            items: if type_tag == TypeTag::Array {
                Some(self.items.unwrap_or(TypeTag::Unknown))
            } else {
                None
            },
        }
    }
}

/// Infers a `SchemaShape` from sampled documents
#[derive(Debug, Clone)]
pub struct ShapeInferrer {
    max_depth: usize,
    id_field: Option<String>,
}

impl ShapeInferrer {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
            id_field: None,
        }
    }

    /// Exclude the store's native id field from the shape
    pub fn skipping_id(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Infer the shape of `documents`. An empty sample yields an empty shape.
    pub fn infer(&self, documents: &[Map<String, Value>]) -> SchemaShape {
        let mut paths: BTreeMap<String, Accumulator> = BTreeMap::new();

        for doc in documents {
            for observed in observe_document(doc, self.max_depth, self.id_field.as_deref()) {
                paths.entry(observed.path.clone()).or_default().observe(&observed);
            }
        }

        paths
            .into_iter()
            .map(|(path, acc)| (path, acc.finish(documents.len())))
            .collect()
    }
}

impl Default for ShapeInferrer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
