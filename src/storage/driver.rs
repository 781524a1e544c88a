//! Storage Driver Adapter contract
//!
//! A thin capability interface over the underlying document store. The
//! gateway never assumes a schema; documents travel as opaque JSON maps
//! that include the store's native id field (see [`StorageDriver::id_field`]).

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::errors::DriverResult;
use super::filter::FilterSet;

/// A raw document as the store returns it
pub type RawDocument = Map<String, Value>;

/// Document store operations, parameterized by database and collection name.
///
/// Implementations own their retry policy; callers above this layer never
/// retry. Every method may be abandoned mid-flight when the caller's
/// deadline expires, so implementations must not leave partial state that
/// depends on the future being polled to completion.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Name of the store's native id field (for example `_id`)
    fn id_field(&self) -> &str;

    /// Check that the store is reachable
    async fn ping(&self) -> DriverResult<()>;

    /// Create or select a database. Returns `true` if it was newly created.
    async fn create_database(&self, db: &str) -> DriverResult<bool>;

    /// List every database the store knows about
    async fn list_databases(&self) -> DriverResult<Vec<String>>;

    /// List collection names within a database
    async fn list_collections(&self, db: &str) -> DriverResult<Vec<String>>;

    /// Whether a collection exists in a database
    async fn collection_exists(&self, db: &str, collection: &str) -> DriverResult<bool>;

    /// Fetch up to `limit` documents in whatever order is cheapest
    async fn sample(&self, db: &str, collection: &str, limit: usize)
        -> DriverResult<Vec<RawDocument>>;

    /// Fetch one window of documents matching `filter`
    async fn find(
        &self,
        db: &str,
        collection: &str,
        filter: &FilterSet,
        offset: usize,
        limit: usize,
    ) -> DriverResult<Vec<RawDocument>>;

    /// Insert a document; the store assigns the id. Creates the collection
    /// on first write.
    async fn insert(&self, db: &str, collection: &str, document: RawDocument)
        -> DriverResult<RawDocument>;

    /// Fetch a document by id
    async fn get(&self, db: &str, collection: &str, id: &str) -> DriverResult<Option<RawDocument>>;

    /// Merge `patch` into the top-level fields of a document
    async fn update(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        patch: RawDocument,
    ) -> DriverResult<Option<RawDocument>>;

    /// Delete a document. Returns `false` if no document had that id.
    async fn delete(&self, db: &str, collection: &str, id: &str) -> DriverResult<bool>;
}
