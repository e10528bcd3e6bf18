//! Entity, column, and association definitions supplied by the caller.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Columns the registry owns: injected when absent, never writable.
pub const SYSTEM_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Primary key type, used to parse path ids and to generate ids in
/// backends that assign them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

impl PkType {
    /// Syntactic id validation: a malformed id is rejected before the
    /// store is consulted.
    pub fn parse_id(&self, raw: &str) -> Result<Value, AppError> {
        Ok(match self {
            PkType::Uuid => {
                let u = uuid::Uuid::parse_str(raw)
                    .map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
                Value::String(u.to_string())
            }
            PkType::BigInt | PkType::Int => {
                let n: i64 = raw
                    .parse()
                    .map_err(|_| AppError::BadRequest("invalid id".into()))?;
                Value::Number(n.into())
            }
            PkType::Text => Value::String(raw.to_string()),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// PostgreSQL type name for SQL casts (e.g. "timestamptz", "date")
    /// when binding string values. None for types that bind directly.
    #[serde(default)]
    pub pg_type: Option<String>,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnDef {
    pub fn new(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            pg_type: None,
            nullable: true,
        }
    }

    pub fn required(name: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            pg_type: None,
            nullable: false,
        }
    }

    pub fn with_pg_type(mut self, pg_type: &str) -> Self {
        self.pg_type = Some(pg_type.to_string());
        self
    }
}

/// Per-field request validation rules.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    /// "email" or "uuid".
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// Join table description for a many-to-many association. The join row
/// carries both foreign keys plus any edge columns (e.g. a measurement
/// amount and unit on a recipe-ingredient edge).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinSpec {
    pub table: String,
    pub owner_fk: String,
    pub related_fk: String,
    #[serde(default)]
    pub edge_columns: Vec<ColumnDef>,
    #[serde(default)]
    pub edge_validation: HashMap<String, ValidationRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AssociationKind {
    /// FK lives on us, pointing at the related entity's PK.
    BelongsTo { fk_column: String },
    /// FK lives on the related entity, at most one related row per owner.
    HasOne { fk_column: String },
    /// FK lives on the related entity, any number of related rows.
    HasMany { fk_column: String },
    /// Join table holds both FKs plus optional edge attributes.
    ManyToMany(JoinSpec),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssociationDef {
    /// Name used for the include key and the link route segment
    /// (e.g. "tasks", "ingredients").
    pub name: String,
    /// Path segment of the related entity.
    pub related: String,
    pub kind: AssociationKind,
    /// Subset of related columns to select in includes; None selects all.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityDef {
    /// Display name used in error messages (e.g. "Task").
    pub name: String,
    /// URL path segment (e.g. "tasks").
    pub path_segment: String,
    pub table: String,
    pub pk_column: String,
    pub pk_type: PkType,
    pub columns: Vec<ColumnDef>,
    /// Allow-list of fields accepted on create/update. Everything else in
    /// a request body is dropped, never persisted.
    pub writable: Vec<String>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
    /// Association names eager-loaded on list/get.
    #[serde(default)]
    pub eager_includes: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

impl EntityDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn is_system_column(name: &str) -> bool {
        SYSTEM_COLUMNS.contains(&name)
    }
}
