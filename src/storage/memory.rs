//! In-memory document store
//!
//! Process-local implementation of [`StorageDriver`]. Collections are
//! created on first insert and ids are per-collection increasing integers
//! rendered as strings. Fault injection (`set_available`, `set_latency`)
//! lets callers exercise unavailability and timeouts.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::driver::{RawDocument, StorageDriver};
use super::errors::{DriverError, DriverResult};
use super::filter::FilterSet;

/// Native id field used by the in-memory store
pub const MEMORY_ID_FIELD: &str = "_id";

#[derive(Debug, Default)]
struct CollectionData {
    documents: BTreeMap<u64, RawDocument>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct DatabaseData {
    collections: HashMap<String, CollectionData>,
}

/// In-memory storage driver
#[derive(Debug)]
pub struct MemoryDriver {
    databases: RwLock<HashMap<String, DatabaseData>>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Make every operation fail with `Unavailable` while `false`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn enter(&self) -> DriverResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(DriverError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&HashMap<String, DatabaseData>) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let guard = self
            .databases
            .read()
            .map_err(|_| DriverError::Backend("lock poisoned".to_string()))?;
        f(&guard)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, DatabaseData>) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let mut guard = self
            .databases
            .write()
            .map_err(|_| DriverError::Backend("lock poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn database<'a>(
    dbs: &'a HashMap<String, DatabaseData>,
    db: &str,
) -> DriverResult<&'a DatabaseData> {
    dbs.get(db)
        .ok_or_else(|| DriverError::DatabaseMissing(db.to_string()))
}

fn database_mut<'a>(
    dbs: &'a mut HashMap<String, DatabaseData>,
    db: &str,
) -> DriverResult<&'a mut DatabaseData> {
    dbs.get_mut(db)
        .ok_or_else(|| DriverError::DatabaseMissing(db.to_string()))
}

fn parse_id(id: &str) -> Option<u64> {
    id.parse().ok()
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn id_field(&self) -> &str {
        MEMORY_ID_FIELD
    }

    async fn ping(&self) -> DriverResult<()> {
        self.enter().await
    }

    async fn create_database(&self, db: &str) -> DriverResult<bool> {
        self.enter().await?;
        if db.is_empty() {
            return Err(DriverError::InvalidName(db.to_string()));
        }
        self.write(|dbs| {
            if dbs.contains_key(db) {
                return Ok(false);
            }
            dbs.insert(db.to_string(), DatabaseData::default());
            Ok(true)
        })
    }

    async fn list_databases(&self) -> DriverResult<Vec<String>> {
        self.enter().await?;
        self.read(|dbs| {
            let mut names: Vec<String> = dbs.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    async fn list_collections(&self, db: &str) -> DriverResult<Vec<String>> {
        self.enter().await?;
        self.read(|dbs| {
            let mut names: Vec<String> =
                database(dbs, db)?.collections.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    async fn collection_exists(&self, db: &str, collection: &str) -> DriverResult<bool> {
        self.enter().await?;
        self.read(|dbs| Ok(database(dbs, db)?.collections.contains_key(collection)))
    }

    async fn sample(
        &self,
        db: &str,
        collection: &str,
        limit: usize,
    ) -> DriverResult<Vec<RawDocument>> {
        self.enter().await?;
        self.read(|dbs| {
            let data = database(dbs, db)?;
            Ok(data
                .collections
                .get(collection)
                .map(|c| c.documents.values().take(limit).cloned().collect())
                .unwrap_or_default())
        })
    }

    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: &FilterSet,
        offset: usize,
        limit: usize,
    ) -> DriverResult<Vec<RawDocument>> {
        self.enter().await?;
        self.read(|dbs| {
            let data = database(dbs, db)?;
            Ok(data
                .collections
                .get(collection)
                .map(|c| {
                    c.documents
                        .values()
                        .filter(|d| filter.matches(d))
                        .skip(offset)
                        .take(limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn insert(
        &self,
        db: &str,
        collection: &str,
        mut document: RawDocument,
    ) -> DriverResult<RawDocument> {
        self.enter().await?;
        self.write(|dbs| {
            let data = database_mut(dbs, db)?;
            let coll = data.collections.entry(collection.to_string()).or_default();
            coll.next_id += 1;
            let id = coll.next_id;
            document.insert(MEMORY_ID_FIELD.to_string(), Value::String(id.to_string()));
            coll.documents.insert(id, document.clone());
            Ok(document)
        })
    }

    async fn get(
        &self,
        db: &str,
        collection: &str,
        id: &str,
    ) -> DriverResult<Option<RawDocument>> {
        self.enter().await?;
        self.read(|dbs| {
            let coll = database(dbs, db)?
                .collections
                .get(collection)
                .ok_or_else(|| DriverError::CollectionMissing(collection.to_string()))?;
            Ok(parse_id(id).and_then(|key| coll.documents.get(&key).cloned()))
        })
    }

    async fn update(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        patch: RawDocument,
    ) -> DriverResult<Option<RawDocument>> {
        self.enter().await?;
        self.write(|dbs| {
            let coll = database_mut(dbs, db)?
                .collections
                .get_mut(collection)
                .ok_or_else(|| DriverError::CollectionMissing(collection.to_string()))?;
            let Some(document) = parse_id(id).and_then(|key| coll.documents.get_mut(&key)) else {
                return Ok(None);
            };
            for (key, value) in patch {
                if key != MEMORY_ID_FIELD {
                    document.insert(key, value);
                }
            }
            Ok(Some(document.clone()))
        })
    }

    async fn delete(&self, db: &str, collection: &str, id: &str) -> DriverResult<bool> {
        self.enter().await?;
        self.write(|dbs| {
            let coll = database_mut(dbs, db)?
                .collections
                .get_mut(collection)
                .ok_or_else(|| DriverError::CollectionMissing(collection.to_string()))?;
            Ok(parse_id(id)
                .and_then(|key| coll.documents.remove(&key))
                .is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::storage::FilterExpr;

    fn doc(value: Value) -> RawDocument {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_database_is_idempotent() {
        let driver = MemoryDriver::new();
        assert!(driver.create_database("shop").await.unwrap());
        assert!(!driver.create_database("shop").await.unwrap());
        assert_eq!(driver.list_databases().await.unwrap(), vec!["shop"]);
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let driver = MemoryDriver::new();
        driver.create_database("shop").await.unwrap();

        let first = driver.insert("shop", "orders", doc(json!({"item": "pen"}))).await.unwrap();
        let second = driver.insert("shop", "orders", doc(json!({"item": "ink"}))).await.unwrap();

        assert_eq!(first["_id"], "1");
        assert_eq!(second["_id"], "2");
        assert!(driver.collection_exists("shop", "orders").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_into_missing_database() {
        let driver = MemoryDriver::new();
        let result = driver.insert("nowhere", "orders", doc(json!({}))).await;
        assert_eq!(result, Err(DriverError::DatabaseMissing("nowhere".to_string())));
    }

    #[tokio::test]
    async fn test_update_merges_top_level() {
        let driver = MemoryDriver::new();
        driver.create_database("shop").await.unwrap();
        driver
            .insert("shop", "orders", doc(json!({"item": "pen", "qty": 3})))
            .await
            .unwrap();

        let updated = driver
            .update("shop", "orders", "1", doc(json!({"qty": 4, "_id": "99"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated, doc(json!({"_id": "1", "item": "pen", "qty": 4})));
        assert_eq!(driver.update("shop", "orders", "7", doc(json!({}))).await, Ok(None));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let driver = MemoryDriver::new();
        driver.create_database("shop").await.unwrap();
        driver.insert("shop", "orders", doc(json!({"item": "pen"}))).await.unwrap();

        assert!(driver.delete("shop", "orders", "1").await.unwrap());
        assert!(!driver.delete("shop", "orders", "1").await.unwrap());
        assert!(!driver.delete("shop", "orders", "not-a-number").await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let driver = MemoryDriver::new();
        driver.create_database("shop").await.unwrap();
        driver.insert("shop", "orders", doc(json!({"n": 1}))).await.unwrap();
        driver.delete("shop", "orders", "1").await.unwrap();

        let next = driver.insert("shop", "orders", doc(json!({"n": 2}))).await.unwrap();
        assert_eq!(next["_id"], "2");
    }

    #[tokio::test]
    async fn test_find_filters_and_windows() {
        let driver = MemoryDriver::new();
        driver.create_database("shop").await.unwrap();
        for qty in 1..=5 {
            driver
                .insert("shop", "orders", doc(json!({"qty": qty})))
                .await
                .unwrap();
        }

        let filter = FilterSet::new().and(FilterExpr::gt("qty", json!(1)));
        let window = driver.find("shop", "orders", &filter, 1, 2).await.unwrap();

        let qtys: Vec<i64> = window.iter().map(|d| d["qty"].as_i64().unwrap()).collect();
        assert_eq!(qtys, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let driver = MemoryDriver::new();
        driver.set_available(false);
        assert!(matches!(driver.ping().await, Err(DriverError::Unavailable(_))));

        driver.set_available(true);
        assert!(driver.ping().await.is_ok());
    }
}
