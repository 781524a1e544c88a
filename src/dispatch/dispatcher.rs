//! CRUD operations over one collection
//!
//! Writes are validated in permissive mode: unknown fields are accepted and
//! invalidate the cached schema, but a value whose type conflicts with a
//! required, non-mixed path is rejected. No registry lock is held while a
//! store call is in flight.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::pager::{DocumentPager, Page};
use super::params::ListParams;
use crate::context::RequestContext;
use crate::errors::{GatewayError, GatewayResult};
use crate::observability::Logger;
use crate::registry::{validate_collection_name, Registry};
use crate::schema::{
    SchemaInferenceEngine, SchemaShape, ValidationDetails, WriteValidator, WriteVerdict,
};
use crate::storage::{FilterExpr, FilterSet, RawDocument, StorageDriver};

/// Key the native id is surfaced under
pub const ID_KEY: &str = "id";

pub struct CrudDispatcher {
    driver: Arc<dyn StorageDriver>,
    registry: Arc<Registry>,
    engine: Arc<SchemaInferenceEngine>,
    validator: WriteValidator,
}

impl CrudDispatcher {
    pub fn new(
        driver: Arc<dyn StorageDriver>,
        registry: Arc<Registry>,
        engine: Arc<SchemaInferenceEngine>,
    ) -> Self {
        let validator = WriteValidator::new(engine.config().max_depth);
        Self {
            driver,
            registry,
            engine,
            validator,
        }
    }

    /// One page of documents matching `params`
    pub async fn list(
        &self,
        db: &str,
        collection: &str,
        params: &ListParams,
        ctx: &RequestContext,
    ) -> GatewayResult<Page> {
        self.target(db, collection, ctx).await?;

        let filter = params
            .filters
            .iter()
            .fold(FilterSet::new(), |set, f| set.and(self.native_filter(f)));

        // One extra document tells whether another page follows
        let fetched = ctx
            .run(
                "find",
                self.driver
                    .find(db, collection, &filter, params.offset, params.limit + 1),
            )
            .await;
        self.registry.record_outcome(db, &fetched);
        let mut raw = fetched?;

        let next_offset = if raw.len() > params.limit {
            raw.truncate(params.limit);
            Some(params.offset + params.limit)
        } else {
            None
        };

        let documents = raw
            .into_iter()
            .map(|doc| project(self.normalize(doc), params.select.as_deref()))
            .collect();

        Ok(Page {
            documents,
            limit: params.limit,
            offset: params.offset,
            next_offset,
        })
    }

    /// Lazy pager over the same listing contract as [`CrudDispatcher::list`]
    pub fn pager(&self, db: &str, collection: &str, params: ListParams) -> DocumentPager<'_> {
        DocumentPager::new(self, db, collection, params)
    }

    /// Insert a document; the store assigns its id
    pub async fn create(
        &self,
        db: &str,
        collection: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> GatewayResult<Map<String, Value>> {
        let document = into_object(body)?;
        if document.contains_key(ID_KEY) || document.contains_key(self.driver.id_field()) {
            return Err(GatewayError::SchemaViolation(ValidationDetails::new(
                ID_KEY,
                "absent (assigned by the store)",
                "caller-supplied id",
            )));
        }
        self.target(db, collection, ctx).await?;

        let shape = self.engine.cached_or_detect(db, collection, ctx).await?;
        let verdict = self.check(db, collection, &shape, &document, ctx)?;
        let omitted = self.validator.omitted_required(&shape, &document);

        let inserted = ctx
            .run("insert", self.driver.insert(db, collection, document))
            .await;
        self.registry.record_outcome(db, &inserted);
        let inserted = inserted?;

        self.after_write(db, collection, &verdict);
        if !omitted.is_empty() && !verdict.requires_refresh() {
            // A required path is now optional in the collection
            self.engine.invalidate(db, collection);
        }
        Ok(self.normalize(inserted))
    }

    /// Fetch a document by id
    pub async fn read(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        ctx: &RequestContext,
    ) -> GatewayResult<Map<String, Value>> {
        self.target(db, collection, ctx).await?;

        let found = ctx.run("get", self.driver.get(db, collection, id)).await;
        self.registry.record_outcome(db, &found);
        match found? {
            Some(doc) => Ok(self.normalize(doc)),
            None => Err(GatewayError::NotFound(id.to_string())),
        }
    }

    /// Merge the fields of `body` into an existing document
    pub async fn update(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        body: Value,
        ctx: &RequestContext,
    ) -> GatewayResult<Map<String, Value>> {
        let mut patch = into_object(body)?;
        for key in [ID_KEY, self.driver.id_field()] {
            if let Some(supplied) = patch.remove(key) {
                if !id_matches(&supplied, id) {
                    return Err(GatewayError::SchemaViolation(ValidationDetails::new(
                        key,
                        format!("'{}' (the path id)", id),
                        supplied.to_string(),
                    )));
                }
            }
        }
        self.target(db, collection, ctx).await?;

        let shape = self.engine.cached_or_detect(db, collection, ctx).await?;
        let verdict = self.check(db, collection, &shape, &patch, ctx)?;
        let omitted = self.validator.omitted_in_patch(&shape, &patch);
        let updated = ctx
            .run("update", self.driver.update(db, collection, id, patch))
            .await;
        self.registry.record_outcome(db, &updated);

        match updated? {
            Some(doc) => {
                self.after_write(db, collection, &verdict);
                if !omitted.is_empty() && !verdict.requires_refresh() {
                    self.engine.invalidate(db, collection);
                }
                Ok(self.normalize(doc))
            }
            None => Err(GatewayError::NotFound(id.to_string())),
        }
    }

    /// Delete a document. Deleting an already-deleted id is `NotFound`.
    pub async fn delete(
        &self,
        db: &str,
        collection: &str,
        id: &str,
        ctx: &RequestContext,
    ) -> GatewayResult<()> {
        self.target(db, collection, ctx).await?;

        let deleted = ctx
            .run("delete", self.driver.delete(db, collection, id))
            .await;
        self.registry.record_outcome(db, &deleted);
        if deleted? {
            Ok(())
        } else {
            Err(GatewayError::NotFound(id.to_string()))
        }
    }

    async fn target(&self, db: &str, collection: &str, ctx: &RequestContext) -> GatewayResult<()> {
        validate_collection_name(collection)?;
        self.registry
            .resolve(self.driver.as_ref(), db, ctx)
            .await
            .map(|_| ())
    }

    /// Validate the fields present in a write against the collection's shape
    fn check(
        &self,
        db: &str,
        collection: &str,
        shape: &SchemaShape,
        fields: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> GatewayResult<WriteVerdict> {
        match self.validator.validate(shape, fields) {
            WriteVerdict::Rejected(details) => {
                Logger::info(
                    "WRITE_REJECTED",
                    &[
                        ("collection", collection),
                        ("database", db),
                        ("field", &details.field),
                        ("request_id", &ctx.request_id.to_string()),
                    ],
                );
                Err(GatewayError::SchemaViolation(details))
            }
            verdict => Ok(verdict),
        }
    }

    fn after_write(&self, db: &str, collection: &str, verdict: &WriteVerdict) {
        if let WriteVerdict::AcceptedWithNewField(paths) = verdict {
            Logger::trace(
                "SCHEMA_INVALIDATED",
                &[
                    ("collection", collection),
                    ("database", db),
                    ("paths", &paths.join(",")),
                ],
            );
            self.engine.invalidate(db, collection);
        }
    }

    fn native_filter(&self, filter: &FilterExpr) -> FilterExpr {
        if filter.field == ID_KEY {
            FilterExpr::new(self.driver.id_field(), filter.operator, id_operand(&filter.value))
        } else {
            filter.clone()
        }
    }

    /// Surface the native id field under `id`
    fn normalize(&self, mut doc: RawDocument) -> Map<String, Value> {
        if let Some(id) = doc.remove(self.driver.id_field()) {
            doc.insert(ID_KEY.to_string(), id);
        }
        doc
    }
}

fn into_object(body: Value) -> GatewayResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(GatewayError::invalid_request(format!(
            "body must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ids are strings; a numeric filter operand is compared by its text
fn id_operand(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Array(items) => Value::Array(items.iter().map(id_operand).collect()),
        other => other.clone(),
    }
}

fn id_matches(supplied: &Value, id: &str) -> bool {
    match supplied {
        Value::String(s) => s == id,
        Value::Number(n) => n.to_string() == id,
        _ => false,
    }
}

fn project(mut doc: Map<String, Value>, select: Option<&[String]>) -> Map<String, Value> {
    let Some(fields) = select else {
        return doc;
    };
    fields
        .iter()
        .filter_map(|f| doc.remove(f).map(|v| (f.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::storage::MemoryDriver;
    use serde_json::json;

    async fn setup() -> (Arc<MemoryDriver>, CrudDispatcher) {
        let driver = Arc::new(MemoryDriver::new());
        driver.create_database("shop").await.unwrap();
        let registry = Arc::new(Registry::new());
        registry.register("shop");
        let engine = Arc::new(SchemaInferenceEngine::new(
            driver.clone(),
            registry.clone(),
            SchemaConfig::default(),
        ));
        let dispatcher = CrudDispatcher::new(driver.clone(), registry, engine);
        (driver, dispatcher)
    }

    #[tokio::test]
    async fn test_create_normalizes_id() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();

        let doc = dispatcher
            .create("shop", "orders", json!({"sku": "A1"}), &ctx)
            .await
            .unwrap();
        assert_eq!(doc["id"], "1");
        assert!(!doc.contains_key("_id"));
    }

    #[tokio::test]
    async fn test_create_rejects_supplied_id() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();

        for body in [json!({"id": "7", "sku": "A1"}), json!({"_id": "7"})] {
            let err = dispatcher
                .create("shop", "orders", body, &ctx)
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::SchemaViolation(_)));
        }
    }

    #[tokio::test]
    async fn test_body_must_be_object() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();
        let err = dispatcher
            .create("shop", "orders", json!([1, 2]), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_update_with_matching_id() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();
        dispatcher
            .create("shop", "orders", json!({"sku": "A1", "qty": 1}), &ctx)
            .await
            .unwrap();

        let doc = dispatcher
            .update("shop", "orders", "1", json!({"id": "1", "qty": 3}), &ctx)
            .await
            .unwrap();
        assert_eq!(doc["qty"], 3);
        assert_eq!(doc["sku"], "A1");

        let err = dispatcher
            .update("shop", "orders", "1", json!({"id": "2"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_list_filters_on_id() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();
        for sku in ["A1", "B2", "C3"] {
            dispatcher
                .create("shop", "orders", json!({"sku": sku}), &ctx)
                .await
                .unwrap();
        }

        let params = ListParams::default().with_filter(FilterExpr::eq("id", json!(2)));
        let page = dispatcher.list("shop", "orders", &params, &ctx).await.unwrap();
        assert_eq!(page.documents.len(), 1);
        assert_eq!(page.documents[0]["sku"], "B2");
    }

    #[tokio::test]
    async fn test_list_select_projection() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();
        dispatcher
            .create("shop", "orders", json!({"sku": "A1", "qty": 2}), &ctx)
            .await
            .unwrap();

        let params = ListParams {
            select: Some(vec!["id".into(), "qty".into()]),
            ..Default::default()
        };
        let page = dispatcher.list("shop", "orders", &params, &ctx).await.unwrap();
        let doc = &page.documents[0];
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["id"], "1");
        assert!(!doc.contains_key("sku"));
    }

    #[tokio::test]
    async fn test_pager_walks_and_restarts() {
        let (_, dispatcher) = setup().await;
        let ctx = RequestContext::default();
        for n in 0..5 {
            dispatcher
                .create("shop", "orders", json!({"n": n}), &ctx)
                .await
                .unwrap();
        }

        let mut pager = dispatcher.pager("shop", "orders", ListParams::default().with_limit(2));
        let mut sizes = Vec::new();
        while let Some(page) = pager.next_page(&ctx).await.unwrap() {
            sizes.push(page.documents.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(pager.is_exhausted());

        pager.restart();
        let first = pager.next_page(&ctx).await.unwrap().unwrap();
        assert_eq!(first.documents[0]["n"], 0);
    }
}
