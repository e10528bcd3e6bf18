//! Generic CRUD controller: one implementation serves every entity.
//!
//! Stateless per call; concurrent operations on the same id are a
//! read-modify-write race with no mutual exclusion at this layer.

use crate::controller::RequestValidator;
use crate::error::AppError;
use crate::model::{EntityDef, ModelRegistry};
use crate::store::{Page, Store};
use serde_json::{Map, Value};

pub struct ResourceController<'a> {
    registry: &'a ModelRegistry,
    entity: &'a EntityDef,
    store: &'a dyn Store,
}

impl<'a> ResourceController<'a> {
    pub fn new(registry: &'a ModelRegistry, entity: &'a EntityDef, store: &'a dyn Store) -> Self {
        ResourceController {
            registry,
            entity,
            store,
        }
    }

    /// All live rows with the entity's configured eager includes.
    pub async fn list(&self, page: Page) -> Result<Vec<Value>, AppError> {
        let plans = self.registry.include_plans(self.entity);
        Ok(self.store.find_all(self.entity, &plans, page).await?)
    }

    /// One live row by id, with includes, or NotFound.
    pub async fn get(&self, id: &Value) -> Result<Value, AppError> {
        let plans = self.registry.include_plans(self.entity);
        self.store
            .find_by_id(self.entity, id, &plans)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Create from the writable-field subset of the body. Unknown and
    /// system fields are dropped before anything else looks at them.
    pub async fn create(&self, body: Map<String, Value>) -> Result<Value, AppError> {
        let fields = self.allow_listed(body);
        RequestValidator::validate(&fields, &self.entity.validation)?;
        tracing::debug!(entity = %self.entity.path_segment, "create");
        Ok(self.store.create(self.entity, &fields).await?)
    }

    /// Merge patch: supplied fields overwrite, absent fields keep their
    /// stored value. Applying the same patch twice yields the same state.
    pub async fn update(&self, id: &Value, body: Map<String, Value>) -> Result<Value, AppError> {
        let fields = self.allow_listed(body);
        RequestValidator::validate_partial(&fields, &self.entity.validation)?;
        tracing::debug!(entity = %self.entity.path_segment, "update");
        self.store
            .update(self.entity, id, &fields)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Soft delete. A second destroy on the same id is NotFound: the row
    /// is no longer live from this contract's point of view.
    pub async fn destroy(&self, id: &Value) -> Result<(), AppError> {
        tracing::debug!(entity = %self.entity.path_segment, "destroy");
        self.store
            .soft_delete(self.entity, id)
            .await?
            .map(|_| ())
            .ok_or_else(|| self.not_found())
    }

    fn allow_listed(&self, body: Map<String, Value>) -> Map<String, Value> {
        body.into_iter()
            .filter(|(k, _)| {
                !EntityDef::is_system_column(k)
                    && self.entity.writable.iter().any(|w| w == k)
                    && self.entity.has_column(k)
            })
            .collect()
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.entity.name))
    }
}
