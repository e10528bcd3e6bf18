//! In-process store with the same observable semantics as the PostgreSQL
//! backend. Backs the test suite and works for demos without a database.

use crate::error::StoreError;
use crate::model::{EntityDef, IncludePlan, IncludeShape, JoinSpec, PkType};
use crate::store::{Page, Store};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Map<String, Value>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn is_live(row: &Map<String, Value>) -> bool {
    matches!(row.get("deleted_at"), None | Some(Value::Null))
}

fn values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn pk_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_i64()
            .unwrap_or(i64::MAX)
            .cmp(&y.as_i64().unwrap_or(i64::MAX)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Project a row to the selected field subset, missing columns as null.
fn project(row: &Map<String, Value>, entity: &EntityDef, fields: Option<&[String]>) -> Map<String, Value> {
    let mut out = Map::new();
    for c in &entity.columns {
        if fields.map(|f| f.iter().any(|n| n == &c.name)).unwrap_or(true) {
            out.insert(c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null));
        }
    }
    out
}

fn attach_includes(
    tables: &HashMap<String, Table>,
    row: &Map<String, Value>,
    entity: &EntityDef,
    includes: &[IncludePlan<'_>],
) -> Value {
    let mut out = row.clone();
    for c in &entity.columns {
        out.entry(c.name.clone()).or_insert(Value::Null);
    }
    for plan in includes {
        let value = match plan.join {
            None => {
                let our = row.get(plan.our_key).cloned().unwrap_or(Value::Null);
                let mut matches: Vec<Value> = Vec::new();
                if !our.is_null() {
                    if let Some(table) = tables.get(&plan.related.table) {
                        for r in table.rows.iter().filter(|r| is_live(r)) {
                            if r.get(plan.their_key).map(|v| values_eq(v, &our)) == Some(true) {
                                matches.push(Value::Object(project(r, plan.related, plan.fields)));
                            }
                        }
                    }
                }
                match plan.shape {
                    IncludeShape::One => matches.into_iter().next().unwrap_or(Value::Null),
                    IncludeShape::Many => Value::Array(matches),
                }
            }
            Some(join) => {
                let our = row.get(plan.our_key).cloned().unwrap_or(Value::Null);
                let mut matches: Vec<Value> = Vec::new();
                if let (Some(join_table), Some(rel_table)) =
                    (tables.get(&join.table), tables.get(&plan.related.table))
                {
                    for j in join_table.rows.iter().filter(|r| is_live(r)) {
                        if j.get(&join.owner_fk).map(|v| values_eq(v, &our)) != Some(true) {
                            continue;
                        }
                        let related_id = j.get(&join.related_fk).cloned().unwrap_or(Value::Null);
                        let related = rel_table.rows.iter().filter(|r| is_live(r)).find(|r| {
                            r.get(&plan.related.pk_column)
                                .map(|v| values_eq(v, &related_id))
                                == Some(true)
                        });
                        let Some(related) = related else { continue };
                        let mut obj = project(related, plan.related, plan.fields);
                        for edge in &join.edge_columns {
                            obj.insert(
                                edge.name.clone(),
                                j.get(&edge.name).cloned().unwrap_or(Value::Null),
                            );
                        }
                        matches.push(Value::Object(obj));
                    }
                }
                Value::Array(matches)
            }
        };
        out.insert(plan.name.to_string(), value);
    }
    Value::Object(out)
}

/// NOT NULL enforcement, mirroring what the database schema would reject.
fn check_not_null(entity: &EntityDef, row: &Map<String, Value>) -> Result<(), StoreError> {
    for c in &entity.columns {
        if c.nullable || c.name == entity.pk_column || EntityDef::is_system_column(&c.name) {
            continue;
        }
        let missing = matches!(row.get(&c.name), None | Some(Value::Null));
        if missing {
            return Err(StoreError::Constraint(format!(
                "null value in column \"{}\"",
                c.name
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_all(
        &self,
        entity: &EntityDef,
        includes: &[IncludePlan<'_>],
        page: Page,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let mut live: Vec<&Map<String, Value>> = tables
            .get(&entity.table)
            .map(|t| t.rows.iter().filter(|r| is_live(r)).collect())
            .unwrap_or_default();
        live.sort_by(|a, b| {
            pk_cmp(
                a.get(&entity.pk_column).unwrap_or(&Value::Null),
                b.get(&entity.pk_column).unwrap_or(&Value::Null),
            )
        });
        let offset = page.offset.unwrap_or(0) as usize;
        let limit = page.limit.unwrap_or(100).min(1000) as usize;
        Ok(live
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| attach_includes(&tables, r, entity, includes))
            .collect())
    }

    async fn find_by_id(
        &self,
        entity: &EntityDef,
        id: &Value,
        includes: &[IncludePlan<'_>],
    ) -> Result<Option<Value>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let row = tables.get(&entity.table).and_then(|t| {
            t.rows.iter().filter(|r| is_live(r)).find(|r| {
                r.get(&entity.pk_column).map(|v| values_eq(v, id)) == Some(true)
            })
        });
        Ok(row.map(|r| attach_includes(&tables, r, entity, includes)))
    }

    async fn create(
        &self,
        entity: &EntityDef,
        fields: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let table = tables.entry(entity.table.clone()).or_default();

        let mut row = Map::new();
        for c in &entity.columns {
            if let Some(v) = fields.get(&c.name) {
                row.insert(c.name.clone(), v.clone());
            }
        }
        if !row.contains_key(&entity.pk_column) {
            let id = match entity.pk_type {
                PkType::Int | PkType::BigInt => {
                    table.next_id += 1;
                    Value::Number(table.next_id.into())
                }
                PkType::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
                PkType::Text => {
                    return Err(StoreError::Constraint(format!(
                        "null value in column \"{}\"",
                        entity.pk_column
                    )))
                }
            };
            row.insert(entity.pk_column.clone(), id);
        }
        row.insert("created_at".into(), now());
        row.insert("updated_at".into(), now());
        row.insert("deleted_at".into(), Value::Null);
        for c in &entity.columns {
            row.entry(c.name.clone()).or_insert(Value::Null);
        }
        check_not_null(entity, &row)?;
        table.rows.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(
        &self,
        entity: &EntityDef,
        id: &Value,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let Some(table) = tables.get_mut(&entity.table) else {
            return Ok(None);
        };
        let Some(row) = table.rows.iter_mut().filter(|r| is_live(r)).find(|r| {
            r.get(&entity.pk_column).map(|v| values_eq(v, id)) == Some(true)
        }) else {
            return Ok(None);
        };
        for (k, v) in fields {
            if k == &entity.pk_column || !entity.has_column(k) {
                continue;
            }
            if v.is_null() {
                if let Some(c) = entity.column(k) {
                    if !c.nullable {
                        return Err(StoreError::Constraint(format!(
                            "null value in column \"{}\"",
                            k
                        )));
                    }
                }
            }
            row.insert(k.clone(), v.clone());
        }
        if !fields.is_empty() {
            row.insert("updated_at".into(), now());
        }
        Ok(Some(Value::Object(row.clone())))
    }

    async fn soft_delete(
        &self,
        entity: &EntityDef,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let Some(table) = tables.get_mut(&entity.table) else {
            return Ok(None);
        };
        let Some(row) = table.rows.iter_mut().filter(|r| is_live(r)).find(|r| {
            r.get(&entity.pk_column).map(|v| values_eq(v, id)) == Some(true)
        }) else {
            return Ok(None);
        };
        row.insert("deleted_at".into(), now());
        row.insert("updated_at".into(), now());
        Ok(Some(Value::Object(row.clone())))
    }

    async fn create_link(
        &self,
        join: &JoinSpec,
        owner_id: &Value,
        related_id: &Value,
        edge: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let table = tables.entry(join.table.clone()).or_default();

        let mut row = Map::new();
        table.next_id += 1;
        row.insert("id".into(), Value::Number(table.next_id.into()));
        row.insert(join.owner_fk.clone(), owner_id.clone());
        row.insert(join.related_fk.clone(), related_id.clone());
        for c in &join.edge_columns {
            let v = edge.get(&c.name).cloned().unwrap_or(Value::Null);
            if v.is_null() && !c.nullable {
                return Err(StoreError::Constraint(format!(
                    "null value in column \"{}\"",
                    c.name
                )));
            }
            row.insert(c.name.clone(), v);
        }
        row.insert("created_at".into(), now());
        row.insert("updated_at".into(), now());
        row.insert("deleted_at".into(), Value::Null);
        table.rows.push(row.clone());
        Ok(Value::Object(row))
    }
}
