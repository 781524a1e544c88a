//! # Gateway
//!
//! Wires one storage driver to the registry, allocator, inference engine and
//! dispatcher. Built once at startup and shared by the HTTP handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::context::RequestContext;
use crate::dispatch::CrudDispatcher;
use crate::errors::GatewayResult;
use crate::observability::ObservationScope;
use crate::registry::{DatabaseAllocator, Registry};
use crate::schema::SchemaInferenceEngine;
use crate::storage::StorageDriver;

pub struct Gateway {
    config: GatewayConfig,
    driver: Arc<dyn StorageDriver>,
    registry: Arc<Registry>,
    allocator: DatabaseAllocator,
    engine: Arc<SchemaInferenceEngine>,
    dispatcher: CrudDispatcher,
}

impl Gateway {
    pub fn new(driver: Arc<dyn StorageDriver>, config: GatewayConfig) -> Self {
        let registry = Arc::new(Registry::new());
        let allocator = DatabaseAllocator::new(driver.clone(), registry.clone())
            .rejecting_duplicates(config.allocator.reject_duplicates);
        let engine = Arc::new(SchemaInferenceEngine::new(
            driver.clone(),
            registry.clone(),
            config.schema.clone(),
        ));
        let dispatcher = CrudDispatcher::new(driver.clone(), registry.clone(), engine.clone());

        Self {
            config,
            driver,
            registry,
            allocator,
            engine,
            dispatcher,
        }
    }

    /// Check the store and rebuild the registry from it
    pub async fn boot(&self) -> GatewayResult<usize> {
        let scope = ObservationScope::new("GATEWAY_BOOT");
        let ctx = self.context();
        let result = async {
            ctx.run("ping", self.driver.ping()).await?;
            self.registry.rebuild(self.driver.as_ref(), &ctx).await
        }
        .await;

        match result {
            Ok(count) => {
                scope.complete_with_fields(&[("databases", &count.to_string())]);
                Ok(count)
            }
            Err(err) => {
                scope.fail_with(&err);
                Err(err)
            }
        }
    }

    /// A context with the configured default deadline
    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.config.request_timeout())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn allocator(&self) -> &DatabaseAllocator {
        &self.allocator
    }

    pub fn engine(&self) -> &SchemaInferenceEngine {
        &self.engine
    }

    pub fn dispatcher(&self) -> &CrudDispatcher {
        &self.dispatcher
    }
}
