//! Schema Inference Engine
//!
//! `detect(db, collection, options)` samples the collection through the
//! storage driver, infers a [`SchemaShape`] and caches it in the registry.
//! A cached shape is reused while it is fresh, not stale, and was produced
//! with the same sample size.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::inference::ShapeInferrer;
use super::types::SchemaShape;
use crate::config::SchemaConfig;
use crate::context::RequestContext;
use crate::errors::{GatewayError, GatewayResult};
use crate::observability::ObservationScope;
use crate::registry::{validate_collection_name, CachedSchema, Registry};
use crate::storage::StorageDriver;

/// Per-call detection options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Documents to sample; the configured default when `None`
    pub sample_size: Option<usize>,
    /// Bypass the cache
    pub force_refresh: bool,
    /// Fail with `CollectionNotFound` instead of returning an empty shape
    pub require_existing: bool,
}

impl DetectOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            ..Default::default()
        }
    }
}

/// How a detection result was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionStatus {
    /// Freshly sampled from a non-empty collection
    Detected,
    /// Served from the registry cache
    Cached,
    /// Collection is empty or not yet created; the shape is empty
    SampleEmpty,
}

impl DetectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Detected => "detected",
            DetectionStatus::Cached => "cached",
            DetectionStatus::SampleEmpty => "sample-empty",
        }
    }
}

/// Result of a detection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub shape: SchemaShape,
    pub sample_size: usize,
    pub documents_sampled: usize,
    pub status: DetectionStatus,
    pub inferred_at: DateTime<Utc>,
}

impl Detection {
    fn from_cache(cached: CachedSchema) -> Self {
        Self {
            shape: cached.shape,
            sample_size: cached.sample_size,
            documents_sampled: cached.documents_sampled,
            status: DetectionStatus::Cached,
            inferred_at: cached.inferred_at,
        }
    }
}

pub struct SchemaInferenceEngine {
    driver: Arc<dyn StorageDriver>,
    registry: Arc<Registry>,
    config: SchemaConfig,
}

impl SchemaInferenceEngine {
    pub fn new(
        driver: Arc<dyn StorageDriver>,
        registry: Arc<Registry>,
        config: SchemaConfig,
    ) -> Self {
        Self {
            driver,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Detect the schema of `collection` in `db`
    pub async fn detect(
        &self,
        db: &str,
        collection: &str,
        options: DetectOptions,
        ctx: &RequestContext,
    ) -> GatewayResult<Detection> {
        validate_collection_name(collection)?;
        let sample_size = self.sample_size(options.sample_size)?;
        self.registry.resolve(self.driver.as_ref(), db, ctx).await?;

        if !options.force_refresh {
            // An empty cached sample does not prove the collection exists
            let cached = self
                .registry
                .fresh_schema(db, collection, sample_size, self.config.cache_ttl(), Utc::now())
                .filter(|cached| !options.require_existing || cached.documents_sampled > 0);
            if let Some(cached) = cached {
                return Ok(Detection::from_cache(cached));
            }
        }

        let request_id = ctx.request_id.to_string();
        let scope = ObservationScope::with_fields(
            "SCHEMA_DETECT",
            &[
                ("collection", collection),
                ("database", db),
                ("request_id", &request_id),
            ],
        );

        match self
            .sample_and_store(db, collection, sample_size, options.require_existing, ctx)
            .await
        {
            Ok(detection) => {
                scope.complete_with_fields(&[
                    ("documents", &detection.documents_sampled.to_string()),
                    ("fields", &detection.shape.len().to_string()),
                ]);
                Ok(detection)
            }
            Err(err) => {
                scope.fail_with(&err);
                Err(err)
            }
        }
    }

    async fn sample_and_store(
        &self,
        db: &str,
        collection: &str,
        sample_size: usize,
        require_existing: bool,
        ctx: &RequestContext,
    ) -> GatewayResult<Detection> {
        let generation = self.registry.begin_detection(db, collection);

        let exists = ctx
            .run(
                "collection_exists",
                self.driver.collection_exists(db, collection),
            )
            .await;
        self.registry.record_outcome(db, &exists);

        let documents = if exists? {
            ctx.run(
                "sample",
                self.driver.sample(db, collection, sample_size),
            )
            .await?
        } else if require_existing {
            return Err(GatewayError::CollectionNotFound(collection.to_string()));
        } else {
            Vec::new()
        };

        let inferrer =
            ShapeInferrer::new(self.config.max_depth).skipping_id(self.driver.id_field());
        let shape = inferrer.infer(&documents);
        let inferred_at = Utc::now();

        self.registry.store_schema(
            db,
            collection,
            CachedSchema {
                shape: shape.clone(),
                inferred_at,
                sample_size,
                documents_sampled: documents.len(),
                generation,
            },
        );

        Ok(Detection {
            shape,
            sample_size,
            documents_sampled: documents.len(),
            status: if documents.is_empty() {
                DetectionStatus::SampleEmpty
            } else {
                DetectionStatus::Detected
            },
            inferred_at,
        })
    }

    /// Shape to validate writes against: the cached one if fresh, otherwise
    /// a new detection at the default sample size
    pub async fn cached_or_detect(
        &self,
        db: &str,
        collection: &str,
        ctx: &RequestContext,
    ) -> GatewayResult<SchemaShape> {
        let detection = self
            .detect(db, collection, DetectOptions::default(), ctx)
            .await?;
        Ok(detection.shape)
    }

    /// Mark the cached shape stale so the next detection re-samples
    pub fn invalidate(&self, db: &str, collection: &str) {
        self.registry.invalidate(db, collection);
    }

    /// List collection names in a database, sorted
    pub async fn list_collections(
        &self,
        db: &str,
        ctx: &RequestContext,
    ) -> GatewayResult<Vec<String>> {
        self.registry.resolve(self.driver.as_ref(), db, ctx).await?;
        let listed = ctx
            .run("list_collections", self.driver.list_collections(db))
            .await;
        self.registry.record_outcome(db, &listed);
        let mut names = listed?;
        names.sort();
        Ok(names)
    }

    fn sample_size(&self, requested: Option<usize>) -> GatewayResult<usize> {
        match requested {
            None => Ok(self.config.sample_size),
            Some(0) => Err(GatewayError::invalid_request("sample_size must be >= 1")),
            Some(n) if n > self.config.max_sample_size => Err(GatewayError::invalid_request(
                format!("sample_size must be <= {}", self.config.max_sample_size),
            )),
            Some(n) => Ok(n),
        }
    }
}
