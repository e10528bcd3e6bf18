//! Persistence port: the interface controllers speak to a relational store.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::model::{EntityDef, IncludePlan, JoinSpec};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Pagination for list reads. Backends cap the limit at 1000.
#[derive(Clone, Copy, Debug, Default)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Abstract relational store. Soft-deleted rows are invisible to every
/// read, update, and delete; they remain in storage. Implementations
/// enforce schema-level constraints (NOT NULL, foreign keys) and report
/// violations as `StoreError::Constraint`.
#[async_trait]
pub trait Store: Send + Sync {
    /// All live rows, with the given eager loads, ordered by primary key.
    async fn find_all(
        &self,
        entity: &EntityDef,
        includes: &[IncludePlan<'_>],
        page: Page,
    ) -> Result<Vec<Value>, StoreError>;

    /// One live row by primary key, with eager loads.
    async fn find_by_id(
        &self,
        entity: &EntityDef,
        id: &Value,
        includes: &[IncludePlan<'_>],
    ) -> Result<Option<Value>, StoreError>;

    /// Insert a row from already allow-listed fields; returns the created row.
    async fn create(
        &self,
        entity: &EntityDef,
        fields: &Map<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Merge update: only supplied fields overwrite. None if the id does
    /// not resolve to a live row.
    async fn update(
        &self,
        entity: &EntityDef,
        id: &Value,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Stamp deleted_at on a live row. None if absent or already deleted.
    async fn soft_delete(
        &self,
        entity: &EntityDef,
        id: &Value,
    ) -> Result<Option<Value>, StoreError>;

    /// Insert a join row linking owner and related, with edge attributes.
    /// Duplicate edges are permitted unless the schema says otherwise.
    async fn create_link(
        &self,
        join: &JoinSpec,
        owner_id: &Value,
        related_id: &Value,
        edge: &Map<String, Value>,
    ) -> Result<Value, StoreError>;
}
