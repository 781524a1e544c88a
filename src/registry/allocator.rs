//! Database Allocator
//!
//! `allocate(requested)` validates or generates a name, asks the store to
//! create/select the database, and registers the handle. Allocating an
//! existing name returns the existing handle unless duplicates are rejected.

use std::sync::Arc;

use serde::Serialize;

use super::names::validate_database_name;
use super::{DatabaseHandle, Registry};
use crate::context::RequestContext;
use crate::errors::{GatewayError, GatewayResult};
use crate::observability::ObservationScope;
use crate::storage::StorageDriver;

/// Result of an allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    #[serde(rename = "database")]
    pub handle: DatabaseHandle,
    /// `false` when the name was already allocated
    pub created: bool,
}

pub struct DatabaseAllocator {
    driver: Arc<dyn StorageDriver>,
    registry: Arc<Registry>,
    reject_duplicates: bool,
}

impl DatabaseAllocator {
    pub fn new(driver: Arc<dyn StorageDriver>, registry: Arc<Registry>) -> Self {
        Self {
            driver,
            registry,
            reject_duplicates: false,
        }
    }

    /// Fail with `DuplicateName` instead of returning the existing handle
    pub fn rejecting_duplicates(mut self, reject: bool) -> Self {
        self.reject_duplicates = reject;
        self
    }

    /// Allocate `requested`, or a generated name when it is absent or empty
    pub async fn allocate(
        &self,
        requested: Option<&str>,
        ctx: &RequestContext,
    ) -> GatewayResult<Allocation> {
        let name = match requested.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.registry.next_generated_name(),
        };
        validate_database_name(&name)?;

        let request_id = ctx.request_id.to_string();
        let scope = ObservationScope::with_fields(
            "ALLOCATE",
            &[("database", &name), ("request_id", &request_id)],
        );

        if let Some(existing) = self.registry.handle(&name) {
            if self.reject_duplicates {
                let err = GatewayError::DuplicateName(name);
                scope.fail_with(&err);
                return Err(err);
            }
            // Confirm the store can still select it
            let outcome = ctx
                .run("create_database", self.driver.create_database(&name))
                .await;
            self.registry.record_outcome(&name, &outcome);
            if let Err(err) = outcome {
                scope.fail_with(&err);
                return Err(err);
            }
            scope.complete_with_fields(&[("created", "false")]);
            let handle = self.registry.handle(&name).unwrap_or(existing);
            return Ok(Allocation {
                handle,
                created: false,
            });
        }

        let outcome = ctx
            .run("create_database", self.driver.create_database(&name))
            .await;
        let store_created = match outcome {
            Ok(created) => created,
            Err(err) => {
                scope.fail_with(&err);
                return Err(err);
            }
        };
        if !store_created && self.reject_duplicates {
            let err = GatewayError::DuplicateName(name);
            scope.fail_with(&err);
            return Err(err);
        }

        let (handle, registered) = self.registry.register(&name);
        if !registered && self.reject_duplicates {
            let err = GatewayError::DuplicateName(name);
            scope.fail_with(&err);
            return Err(err);
        }
        let created = registered && store_created;
        scope.complete_with_fields(&[("created", if created { "true" } else { "false" })]);
        Ok(Allocation { handle, created })
    }
}
