//! Association edge handler: link creation between two entities.
//!
//! Many-to-many links insert a join row (optionally carrying edge
//! attributes); one-sided associations set the foreign key on whichever
//! side holds it. There is no unlink operation. A create-then-link
//! sequence is not atomic: if linking fails the owner stays created.

use crate::controller::RequestValidator;
use crate::error::AppError;
use crate::model::{AssociationKind, EntityDef, JoinSpec, ModelRegistry};
use crate::store::Store;
use serde_json::{Map, Value};

pub struct EdgeHandler<'a> {
    registry: &'a ModelRegistry,
    entity: &'a EntityDef,
    store: &'a dyn Store,
}

impl<'a> EdgeHandler<'a> {
    pub fn new(registry: &'a ModelRegistry, entity: &'a EntityDef, store: &'a dyn Store) -> Self {
        EdgeHandler {
            registry,
            entity,
            store,
        }
    }

    /// Link `related_id_raw` to the owner through the named association.
    /// The owner must exist and be live; the related id only has to be
    /// syntactically valid here, existence is the store's FK constraint.
    pub async fn link(
        &self,
        owner_id: &Value,
        association: &str,
        related_id_raw: &str,
        edge: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let assoc = self
            .entity
            .association(association)
            .ok_or_else(|| AppError::NotFound(format!("association {} not found", association)))?;
        let related = self.registry.entity_by_path(&assoc.related).ok_or_else(|| {
            AppError::Infrastructure(format!("registry missing entity {}", assoc.related))
        })?;
        let related_id = related.pk_type.parse_id(related_id_raw)?;

        self.store
            .find_by_id(self.entity, owner_id, &[])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", self.entity.name)))?;

        tracing::debug!(
            entity = %self.entity.path_segment,
            association = %association,
            "link"
        );

        match &assoc.kind {
            AssociationKind::ManyToMany(join) => {
                let edge = edge_fields(join, edge);
                RequestValidator::validate(&edge, &join.edge_validation)?;
                Ok(self
                    .store
                    .create_link(join, owner_id, &related_id, &edge)
                    .await?)
            }
            AssociationKind::HasOne { fk_column } | AssociationKind::HasMany { fk_column } => {
                let mut fields = Map::new();
                fields.insert(fk_column.clone(), owner_id.clone());
                self.store
                    .update(related, &related_id, &fields)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{} not found", related.name)))
            }
            AssociationKind::BelongsTo { fk_column } => {
                let mut fields = Map::new();
                fields.insert(fk_column.clone(), related_id.clone());
                self.store
                    .update(self.entity, owner_id, &fields)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("{} not found", self.entity.name)))
            }
        }
    }
}

/// Keep only declared edge columns; anything else in the body is dropped.
fn edge_fields(join: &JoinSpec, body: Map<String, Value>) -> Map<String, Value> {
    body.into_iter()
        .filter(|(k, _)| join.edge_columns.iter().any(|c| &c.name == k))
        .collect()
}
