//! Explicit model registry: validated at construction, injected into
//! controllers instead of an ambient global model set.

use crate::error::RegistryError;
use crate::model::types::{
    AssociationDef, AssociationKind, ColumnDef, EntityDef, JoinSpec, SYSTEM_COLUMNS,
};
use std::collections::{HashMap, HashSet};

/// Shape of an include in a read response: a single object or an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeShape {
    One,
    Many,
}

/// One eager load, resolved against the registry. `join` is set for
/// many-to-many, where the related rows are reached through the join table.
#[derive(Debug)]
pub struct IncludePlan<'a> {
    pub name: &'a str,
    pub shape: IncludeShape,
    pub related: &'a EntityDef,
    /// Column on the main row used in the join.
    pub our_key: &'a str,
    /// Column on the related row used in the join (unused when `join` is set).
    pub their_key: &'a str,
    pub join: Option<&'a JoinSpec>,
    pub fields: Option<&'a [String]>,
}

#[derive(Debug)]
pub struct ModelRegistry {
    entities: Vec<EntityDef>,
    by_path: HashMap<String, usize>,
}

impl ModelRegistry {
    /// Validate definitions and build the lookup index. System columns
    /// (`id`, `created_at`, `updated_at`, `deleted_at`) are appended to any
    /// definition that omits them; they are never writable.
    pub fn new(mut defs: Vec<EntityDef>) -> Result<Self, RegistryError> {
        for def in &mut defs {
            inject_system_columns(def);
        }
        validate(&defs)?;
        let by_path = defs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.path_segment.clone(), i))
            .collect();
        Ok(ModelRegistry {
            entities: defs,
            by_path,
        })
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&EntityDef> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn entities(&self) -> &[EntityDef] {
        &self.entities
    }

    /// Plans for the entity's configured eager includes, in declaration order.
    pub fn include_plans<'a>(&'a self, entity: &'a EntityDef) -> Vec<IncludePlan<'a>> {
        entity
            .eager_includes
            .iter()
            .filter_map(|name| entity.association(name))
            .filter_map(|assoc| self.plan_for(entity, assoc))
            .collect()
    }

    /// Plan for a single association, used by the edge handler.
    pub fn plan_for<'a>(
        &'a self,
        entity: &'a EntityDef,
        assoc: &'a AssociationDef,
    ) -> Option<IncludePlan<'a>> {
        let related = self.entity_by_path(&assoc.related)?;
        let plan = match &assoc.kind {
            AssociationKind::BelongsTo { fk_column } => IncludePlan {
                name: &assoc.name,
                shape: IncludeShape::One,
                related,
                our_key: fk_column,
                their_key: &related.pk_column,
                join: None,
                fields: assoc.fields.as_deref(),
            },
            AssociationKind::HasOne { fk_column } => IncludePlan {
                name: &assoc.name,
                shape: IncludeShape::One,
                related,
                our_key: &entity.pk_column,
                their_key: fk_column,
                join: None,
                fields: assoc.fields.as_deref(),
            },
            AssociationKind::HasMany { fk_column } => IncludePlan {
                name: &assoc.name,
                shape: IncludeShape::Many,
                related,
                our_key: &entity.pk_column,
                their_key: fk_column,
                join: None,
                fields: assoc.fields.as_deref(),
            },
            AssociationKind::ManyToMany(join) => IncludePlan {
                name: &assoc.name,
                shape: IncludeShape::Many,
                related,
                our_key: &entity.pk_column,
                their_key: &related.pk_column,
                join: Some(join),
                fields: assoc.fields.as_deref(),
            },
        };
        Some(plan)
    }
}

fn inject_system_columns(def: &mut EntityDef) {
    let present: HashSet<String> = def.columns.iter().map(|c| c.name.clone()).collect();
    for name in SYSTEM_COLUMNS {
        if !present.contains(name) {
            let mut col = ColumnDef::new(name);
            if name != "id" {
                col.pg_type = Some("timestamptz".into());
            }
            col.nullable = name == "deleted_at";
            def.columns.push(col);
        }
    }
}

fn validate(defs: &[EntityDef]) -> Result<(), RegistryError> {
    let paths: HashMap<&str, &EntityDef> = {
        let mut m = HashMap::new();
        for d in defs {
            if m.insert(d.path_segment.as_str(), d).is_some() {
                return Err(RegistryError::DuplicatePathSegment(d.path_segment.clone()));
            }
        }
        m
    };

    for d in defs {
        if !d.has_column(&d.pk_column) {
            return Err(RegistryError::InvalidPrimaryKey {
                entity: d.path_segment.clone(),
                column: d.pk_column.clone(),
            });
        }
        for w in &d.writable {
            if EntityDef::is_system_column(w) {
                return Err(RegistryError::WritableSystemColumn {
                    entity: d.path_segment.clone(),
                    column: w.clone(),
                });
            }
            if !d.has_column(w) {
                return Err(RegistryError::UnknownColumn {
                    entity: d.path_segment.clone(),
                    column: w.clone(),
                });
            }
        }
        for a in &d.associations {
            let related =
                paths
                    .get(a.related.as_str())
                    .ok_or_else(|| RegistryError::UnknownRelated {
                        entity: d.path_segment.clone(),
                        association: a.name.clone(),
                        related: a.related.clone(),
                    })?;
            match &a.kind {
                AssociationKind::BelongsTo { fk_column } => {
                    if !d.has_column(fk_column) {
                        return Err(RegistryError::UnknownColumn {
                            entity: d.path_segment.clone(),
                            column: fk_column.clone(),
                        });
                    }
                }
                AssociationKind::HasOne { fk_column } | AssociationKind::HasMany { fk_column } => {
                    if !related.has_column(fk_column) {
                        return Err(RegistryError::UnknownColumn {
                            entity: related.path_segment.clone(),
                            column: fk_column.clone(),
                        });
                    }
                }
                AssociationKind::ManyToMany(_) => {}
            }
            if let Some(fields) = &a.fields {
                for f in fields {
                    if !related.has_column(f) {
                        return Err(RegistryError::UnknownColumn {
                            entity: related.path_segment.clone(),
                            column: f.clone(),
                        });
                    }
                }
            }
        }
        for name in &d.eager_includes {
            if d.association(name).is_none() {
                return Err(RegistryError::UnknownInclude {
                    entity: d.path_segment.clone(),
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}
