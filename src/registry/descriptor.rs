//! Collection descriptors and the cached schema they hold
//!
//! Per collection the cache moves through
//! `Unknown -> Detected -> Stale -> Detected -> ...`; there is no terminal
//! state. A write that introduces a new path bumps the descriptor's
//! generation, which marks the cached shape stale. A detection that started
//! before the bump stores its result already stale, so the last detection
//! wins without hiding a newer invalidation.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::schema::SchemaShape;

/// Cache state of a collection's schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaState {
    Unknown,
    Detected,
    Stale,
}

/// A shape together with how it was produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedSchema {
    pub shape: SchemaShape,
    pub inferred_at: DateTime<Utc>,
    /// Sample size requested for the detection
    pub sample_size: usize,
    /// Documents actually returned by the store
    pub documents_sampled: usize,
    /// Descriptor generation the sample was taken at
    pub generation: u64,
}

/// Cached metadata for one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionDescriptor {
    pub database: String,
    pub name: String,
    pub schema: Option<CachedSchema>,
    pub generation: u64,
}

impl CollectionDescriptor {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            schema: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> SchemaState {
        match &self.schema {
            None => SchemaState::Unknown,
            Some(cached) if cached.generation == self.generation => SchemaState::Detected,
            Some(_) => SchemaState::Stale,
        }
    }

    /// Cached schema usable for a request with `sample_size`, if any
    pub fn fresh_schema(
        &self,
        sample_size: usize,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Option<&CachedSchema> {
        if self.state() != SchemaState::Detected {
            return None;
        }
        let cached = self.schema.as_ref()?;
        if cached.sample_size != sample_size {
            return None;
        }
        if let Some(ttl) = ttl {
            if now - cached.inferred_at > ttl {
                return None;
            }
        }
        Some(cached)
    }

    /// The last detected shape regardless of freshness
    pub fn last_shape(&self) -> Option<&SchemaShape> {
        self.schema.as_ref().map(|c| &c.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(sample_size: usize, generation: u64, inferred_at: DateTime<Utc>) -> CachedSchema {
        CachedSchema {
            shape: SchemaShape::new(),
            inferred_at,
            sample_size,
            documents_sampled: 0,
            generation,
        }
    }

    #[test]
    fn test_state_machine() {
        let mut desc = CollectionDescriptor::new("shop", "orders");
        assert_eq!(desc.state(), SchemaState::Unknown);

        desc.schema = Some(cached(100, 0, Utc::now()));
        assert_eq!(desc.state(), SchemaState::Detected);

        desc.generation += 1;
        assert_eq!(desc.state(), SchemaState::Stale);

        desc.schema = Some(cached(100, 1, Utc::now()));
        assert_eq!(desc.state(), SchemaState::Detected);
    }

    #[test]
    fn test_freshness_requires_same_sample_size() {
        let now = Utc::now();
        let mut desc = CollectionDescriptor::new("shop", "orders");
        desc.schema = Some(cached(100, 0, now));

        assert!(desc.fresh_schema(100, None, now).is_some());
        assert!(desc.fresh_schema(10, None, now).is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let now = Utc::now();
        let mut desc = CollectionDescriptor::new("shop", "orders");
        desc.schema = Some(cached(100, 0, now - Duration::seconds(120)));

        assert!(desc.fresh_schema(100, Some(Duration::seconds(60)), now).is_none());
        assert!(desc.fresh_schema(100, Some(Duration::seconds(600)), now).is_some());
    }
}
