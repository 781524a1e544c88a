//! # Registry
//!
//! Process-wide in-memory state: allocated database handles and per-collection
//! descriptors with their cached schemas. Constructed once at service start
//! and passed by `Arc` to every component that needs it.
//!
//! The store stays the source of truth; [`Registry::rebuild`] repopulates the
//! handle map from it on boot. Locks are held only for map updates and never
//! across a store call.

mod allocator;
mod descriptor;
mod handle;
mod names;

pub use allocator::{Allocation, DatabaseAllocator};
pub use descriptor::{CachedSchema, CollectionDescriptor, SchemaState};
pub use handle::{ConnectionState, DatabaseHandle};
pub use names::{validate_collection_name, validate_database_name};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::context::RequestContext;
use crate::errors::{GatewayError, GatewayResult};
use crate::observability::Logger;
use crate::storage::StorageDriver;

type CollectionKey = (String, String);

/// Handles and collection descriptors shared by all requests
#[derive(Debug, Default)]
pub struct Registry {
    handles: RwLock<HashMap<String, DatabaseHandle>>,
    collections: RwLock<HashMap<CollectionKey, CollectionDescriptor>>,
    name_counter: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn key(db: &str, collection: &str) -> CollectionKey {
    (db.to_string(), collection.to_string())
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repopulate handles from the databases the store already holds.
    ///
    /// Returns the number of handles registered.
    pub async fn rebuild(
        &self,
        driver: &dyn StorageDriver,
        ctx: &RequestContext,
    ) -> GatewayResult<usize> {
        let names = ctx.run("list_databases", driver.list_databases()).await?;
        let mut registered = 0;
        for name in names {
            if validate_database_name(&name).is_err() {
                Logger::warn("REGISTRY_SKIP_DATABASE", &[("database", &name)]);
                continue;
            }
            let (_, created) = self.register(&name);
            if created {
                registered += 1;
            }
        }
        Logger::info(
            "REGISTRY_REBUILT",
            &[("databases", &registered.to_string())],
        );
        Ok(registered)
    }

    /// Insert a handle for `name` unless one exists.
    ///
    /// Returns the registered handle and whether it was newly inserted.
    pub fn register(&self, name: &str) -> (DatabaseHandle, bool) {
        let mut handles = write(&self.handles);
        if let Some(existing) = handles.get(name) {
            return (existing.clone(), false);
        }
        let handle = DatabaseHandle::new(name);
        handles.insert(name.to_string(), handle.clone());
        (handle, true)
    }

    /// Look up a registered handle
    pub fn handle(&self, name: &str) -> Option<DatabaseHandle> {
        read(&self.handles).get(name).cloned()
    }

    /// All registered handles, ordered by name
    pub fn handles(&self) -> Vec<DatabaseHandle> {
        let mut all: Vec<_> = read(&self.handles).values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Resolve a database name to its handle.
    ///
    /// A database created in the store outside this process (or before a
    /// restart whose rebuild failed) is registered on first use.
    pub async fn resolve(
        &self,
        driver: &dyn StorageDriver,
        name: &str,
        ctx: &RequestContext,
    ) -> GatewayResult<DatabaseHandle> {
        validate_database_name(name)?;
        if let Some(handle) = self.handle(name) {
            return Ok(handle);
        }

        let listed = ctx.run("list_databases", driver.list_databases()).await;
        self.record_outcome(name, &listed);
        if listed?.iter().any(|db| db == name) {
            let (handle, _) = self.register(name);
            Ok(handle)
        } else {
            Err(GatewayError::DatabaseNotFound(name.to_string()))
        }
    }

    /// Update a handle's connection state from the outcome of a store call
    pub fn record_outcome<T>(&self, name: &str, outcome: &GatewayResult<T>) {
        let state = match outcome {
            Err(GatewayError::StorageUnavailable) => ConnectionState::Unavailable,
            Err(_) => return,
            Ok(_) => ConnectionState::Connected,
        };
        self.set_state(name, state);
    }

    pub fn set_state(&self, name: &str, state: ConnectionState) {
        {
            let handles = read(&self.handles);
            match handles.get(name) {
                Some(handle) if handle.state != state => {}
                _ => return,
            }
        }
        if let Some(handle) = write(&self.handles).get_mut(name) {
            handle.state = state;
        }
    }

    /// Next generated database name: `db_<unix-millis>_<counter>`
    pub fn next_generated_name(&self) -> String {
        let n = self.name_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("db_{}_{}", Utc::now().timestamp_millis(), n)
    }

    // ==================
    // Collection descriptors
    // ==================

    /// Snapshot of a collection's descriptor
    pub fn descriptor(&self, db: &str, collection: &str) -> Option<CollectionDescriptor> {
        read(&self.collections).get(&key(db, collection)).cloned()
    }

    /// Cached schema usable for a request, if one is fresh
    pub fn fresh_schema(
        &self,
        db: &str,
        collection: &str,
        sample_size: usize,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Option<CachedSchema> {
        read(&self.collections)
            .get(&key(db, collection))
            .and_then(|desc| desc.fresh_schema(sample_size, ttl, now))
            .cloned()
    }

    /// Record the start of a detection; returns the generation to store with
    pub fn begin_detection(&self, db: &str, collection: &str) -> u64 {
        if let Some(desc) = read(&self.collections).get(&key(db, collection)) {
            return desc.generation;
        }
        write(&self.collections)
            .entry(key(db, collection))
            .or_insert_with(|| CollectionDescriptor::new(db, collection))
            .generation
    }

    /// Store a detection result. The newest detection wins; a result sampled
    /// before an invalidation is kept but stays stale.
    pub fn store_schema(&self, db: &str, collection: &str, schema: CachedSchema) {
        let mut collections = write(&self.collections);
        let desc = collections
            .entry(key(db, collection))
            .or_insert_with(|| CollectionDescriptor::new(db, collection));
        if let Some(current) = &desc.schema {
            if current.generation > schema.generation {
                return;
            }
        }
        desc.schema = Some(schema);
    }

    /// Mark a collection's cached schema stale
    pub fn invalidate(&self, db: &str, collection: &str) {
        let mut collections = write(&self.collections);
        let desc = collections
            .entry(key(db, collection))
            .or_insert_with(|| CollectionDescriptor::new(db, collection));
        desc.generation += 1;
    }

    /// Descriptors of one database, ordered by collection name
    pub fn descriptors(&self, db: &str) -> Vec<CollectionDescriptor> {
        let mut all: Vec<_> = read(&self.collections)
            .values()
            .filter(|d| d.database == db)
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
