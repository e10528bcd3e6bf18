//! Builds parameterized SELECT, INSERT, UPDATE statements from entity
//! definitions, with soft-delete predicates on every read and write path.

use crate::model::{ColumnDef, EntityDef, IncludePlan, IncludeShape, JoinSpec};
use serde_json::{Map, Value};

const MAIN: &str = "main";

/// Quote an identifier for PostgreSQL (identifiers only ever come from the
/// registry, quoting is belt and suspenders).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// $n placeholder, cast when the column carries a pg type hint so string
/// values bind correctly (e.g. $2::timestamptz).
fn placeholder(n: usize, col: &ColumnDef) -> String {
    match col.pg_type.as_deref() {
        Some(t) => format!("${}::{}", n, t),
        None => format!("${}", n),
    }
}

fn column_expr(col: &ColumnDef, qualifier: Option<&str>) -> String {
    let q = quoted(&col.name);
    let base = match qualifier {
        Some(t) => format!("{}.{}", t, q),
        None => q.clone(),
    };
    // numeric decodes as text so the JSON layer keeps full precision
    if col.pg_type.as_deref() == Some("numeric") {
        format!("{}::text AS {}", base, q)
    } else if qualifier.is_some() {
        format!("{} AS {}", base, q)
    } else {
        base
    }
}

fn select_column_list(
    entity: &EntityDef,
    qualifier: Option<&str>,
    fields: Option<&[String]>,
) -> String {
    entity
        .columns
        .iter()
        .filter(|c| fields.map(|f| f.iter().any(|n| n == &c.name)).unwrap_or(true))
        .map(|c| column_expr(c, qualifier))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scalar subquery for one include: row_to_json for to-one, json_agg for
/// to-many, with a join-table hop for many-to-many. Soft-deleted related
/// rows (and join rows) are excluded.
fn include_subquery(plan: &IncludePlan<'_>) -> String {
    let rel_table = quoted(&plan.related.table);
    match plan.join {
        None => {
            let rel_cols = select_column_list(plan.related, None, plan.fields);
            let from = format!(
                "{} WHERE {} = {}.{} AND {} IS NULL",
                rel_table,
                quoted(plan.their_key),
                MAIN,
                quoted(plan.our_key),
                quoted("deleted_at")
            );
            match plan.shape {
                IncludeShape::One => format!(
                    "(SELECT row_to_json(sub) FROM (SELECT {} FROM {}) sub)",
                    rel_cols, from
                ),
                IncludeShape::Many => format!(
                    "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {}) sub)",
                    rel_cols, from
                ),
            }
        }
        Some(join) => {
            let mut cols: Vec<String> = plan
                .related
                .columns
                .iter()
                .filter(|c| {
                    plan.fields
                        .map(|f| f.iter().any(|n| n == &c.name))
                        .unwrap_or(true)
                })
                .map(|c| column_expr(c, Some("r")))
                .collect();
            for edge in &join.edge_columns {
                cols.push(column_expr(edge, Some("j")));
            }
            format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {} j JOIN {} r ON r.{} = j.{} WHERE j.{} = {}.{} AND j.{} IS NULL AND r.{} IS NULL) sub)",
                cols.join(", "),
                quoted(&join.table),
                rel_table,
                quoted(&plan.related.pk_column),
                quoted(&join.related_fk),
                quoted(&join.owner_fk),
                MAIN,
                quoted(plan.our_key),
                quoted("deleted_at"),
                quoted("deleted_at")
            )
        }
    }
}

fn select_parts(entity: &EntityDef, includes: &[IncludePlan<'_>]) -> String {
    let mut parts: Vec<String> = entity
        .columns
        .iter()
        .map(|c| column_expr(c, Some(MAIN)))
        .collect();
    for plan in includes {
        parts.push(format!("{} AS {}", include_subquery(plan), quoted(plan.name)));
    }
    parts.join(", ")
}

/// SELECT all live rows with includes, ORDER BY pk, optional LIMIT/OFFSET
/// (bound as parameters, with the limit capped at 1000).
pub fn select_list(
    entity: &EntityDef,
    includes: &[IncludePlan<'_>],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {}.{} IS NULL ORDER BY {}.{}",
        select_parts(entity, includes),
        quoted(&entity.table),
        MAIN,
        MAIN,
        quoted("deleted_at"),
        MAIN,
        quoted(&entity.pk_column)
    );
    if let Some(n) = limit {
        let p = q.push_param(Value::from(n.min(1000)));
        q.sql.push_str(&format!(" LIMIT ${}", p));
    }
    if let Some(n) = offset {
        let p = q.push_param(Value::from(n));
        q.sql.push_str(&format!(" OFFSET ${}", p));
    }
    q
}

/// SELECT one live row by primary key, with includes. Binds the id as $1.
pub fn select_by_id(entity: &EntityDef, includes: &[IncludePlan<'_>], id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {}.{} = ${} AND {}.{} IS NULL",
        select_parts(entity, includes),
        quoted(&entity.table),
        MAIN,
        MAIN,
        quoted(&entity.pk_column),
        n,
        MAIN,
        quoted("deleted_at")
    );
    q
}

/// INSERT the supplied fields (already allow-listed), RETURNING all columns.
/// Omitted columns fall back to their DB defaults.
pub fn insert(entity: &EntityDef, fields: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        let Some(v) = fields.get(&c.name) else {
            continue;
        };
        let n = q.push_param(v.clone());
        cols.push(quoted(&c.name));
        placeholders.push(placeholder(n, c));
    }
    let returning = select_column_list(entity, None, None);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            quoted(&entity.table),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(&entity.table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// Merge update: SET only the supplied fields, leave the rest untouched.
/// Only live rows match; an empty patch degenerates to a SELECT so the
/// caller still gets the current row (or a miss).
pub fn update(entity: &EntityDef, id: &Value, fields: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        if c.name == entity.pk_column {
            continue;
        }
        let Some(v) = fields.get(&c.name) else {
            continue;
        };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = {}", quoted(&c.name), placeholder(n, c)));
    }
    let returning = select_column_list(entity, None, None);
    if sets.is_empty() {
        let n = q.push_param(id.clone());
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = ${} AND {} IS NULL",
            returning,
            quoted(&entity.table),
            quoted(&entity.pk_column),
            n,
            quoted("deleted_at")
        );
        return q;
    }
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let n = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} AND {} IS NULL RETURNING {}",
        quoted(&entity.table),
        sets.join(", "),
        quoted(&entity.pk_column),
        n,
        quoted("deleted_at"),
        returning
    );
    q
}

/// Soft delete: stamp deleted_at on a live row. A second call matches
/// nothing, which the caller surfaces as not-found.
pub fn soft_delete(entity: &EntityDef, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} = NOW(), {} = NOW() WHERE {} = ${} AND {} IS NULL RETURNING {}",
        quoted(&entity.table),
        quoted("deleted_at"),
        quoted("updated_at"),
        quoted(&entity.pk_column),
        n,
        quoted("deleted_at"),
        select_column_list(entity, None, None)
    );
    q
}

/// INSERT a join row: both foreign keys plus any supplied edge attributes.
/// No uniqueness is imposed here; duplicate edges are a schema decision.
pub fn insert_link(
    join: &JoinSpec,
    owner_id: &Value,
    related_id: &Value,
    edge: &Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = vec![quoted(&join.owner_fk), quoted(&join.related_fk)];
    let mut placeholders = vec![
        format!("${}", q.push_param(owner_id.clone())),
        format!("${}", q.push_param(related_id.clone())),
    ];
    for c in &join.edge_columns {
        let Some(v) = edge.get(&c.name) else {
            continue;
        };
        let n = q.push_param(v.clone());
        cols.push(quoted(&c.name));
        placeholders.push(placeholder(n, c));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        quoted(&join.table),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssociationDef, AssociationKind, ModelRegistry, PkType, ValidationRule};
    use serde_json::json;
    use std::collections::HashMap;

    fn tasks() -> EntityDef {
        EntityDef {
            name: "Task".into(),
            path_segment: "tasks".into(),
            table: "tasks".into(),
            pk_column: "id".into(),
            pk_type: PkType::Int,
            columns: vec![
                ColumnDef::required("title"),
                ColumnDef::new("complete"),
                ColumnDef::required("user_id"),
            ],
            writable: vec!["title".into(), "complete".into(), "user_id".into()],
            associations: vec![],
            eager_includes: vec![],
            validation: HashMap::new(),
        }
    }

    fn registry() -> ModelRegistry {
        let mut users = EntityDef {
            name: "User".into(),
            path_segment: "users".into(),
            table: "users".into(),
            pk_column: "id".into(),
            pk_type: PkType::Int,
            columns: vec![ColumnDef::required("first_name")],
            writable: vec!["first_name".into()],
            associations: vec![],
            eager_includes: vec![],
            validation: HashMap::new(),
        };
        users.associations.push(AssociationDef {
            name: "tasks".into(),
            related: "tasks".into(),
            kind: AssociationKind::HasMany {
                fk_column: "user_id".into(),
            },
            fields: None,
        });
        users.eager_includes.push("tasks".into());
        ModelRegistry::new(vec![users, tasks()]).unwrap()
    }

    #[test]
    fn select_by_id_filters_soft_deleted() {
        let reg = registry();
        let tasks = reg.entity_by_path("tasks").unwrap();
        let q = select_by_id(tasks, &[], &json!(7));
        assert!(q.sql.contains("WHERE main.\"id\" = $1 AND main.\"deleted_at\" IS NULL"));
        assert_eq!(q.params, vec![json!(7)]);
    }

    #[test]
    fn list_orders_by_pk_and_caps_limit() {
        let reg = registry();
        let tasks = reg.entity_by_path("tasks").unwrap();
        let q = select_list(tasks, &[], Some(5000), Some(10));
        assert!(q.sql.contains("ORDER BY main.\"id\" LIMIT $1 OFFSET $2"));
        assert!(q.sql.contains("main.\"deleted_at\" IS NULL"));
        assert_eq!(q.params, vec![json!(1000), json!(10)]);
    }

    #[test]
    fn list_without_paging_binds_nothing() {
        let reg = registry();
        let tasks = reg.entity_by_path("tasks").unwrap();
        let q = select_list(tasks, &[], None, None);
        assert!(q.sql.ends_with("ORDER BY main.\"id\""));
        assert!(q.params.is_empty());
    }

    #[test]
    fn to_many_include_is_a_json_agg_subquery() {
        let reg = registry();
        let users = reg.entity_by_path("users").unwrap();
        let plans = reg.include_plans(users);
        let q = select_list(users, &plans, None, None);
        assert!(q.sql.contains("COALESCE(json_agg(row_to_json(sub)), '[]'::json)"));
        assert!(q.sql.contains("\"user_id\" = main.\"id\""));
        assert!(q.sql.contains("AS \"tasks\""));
    }

    #[test]
    fn insert_uses_only_supplied_fields() {
        let t = {
            let reg = registry();
            reg.entity_by_path("tasks").unwrap().clone()
        };
        let fields = json!({"title": "Write paper", "user_id": 1})
            .as_object()
            .cloned()
            .unwrap();
        let q = insert(&t, &fields);
        assert_eq!(
            q.sql,
            "INSERT INTO \"tasks\" (\"title\", \"user_id\") VALUES ($1, $2) RETURNING \"title\", \"complete\", \"user_id\", \"id\", \"created_at\", \"updated_at\", \"deleted_at\""
        );
        assert_eq!(q.params, vec![json!("Write paper"), json!(1)]);
    }

    #[test]
    fn update_sets_only_supplied_fields_and_bumps_updated_at() {
        let t = {
            let reg = registry();
            reg.entity_by_path("tasks").unwrap().clone()
        };
        let fields = json!({"complete": true}).as_object().cloned().unwrap();
        let q = update(&t, &json!(3), &fields);
        assert!(q.sql.starts_with("UPDATE \"tasks\" SET \"complete\" = $1, \"updated_at\" = NOW()"));
        assert!(q.sql.contains("WHERE \"id\" = $2 AND \"deleted_at\" IS NULL"));
        assert_eq!(q.params, vec![json!(true), json!(3)]);
    }

    #[test]
    fn empty_patch_degenerates_to_select() {
        let t = {
            let reg = registry();
            reg.entity_by_path("tasks").unwrap().clone()
        };
        let q = update(&t, &json!(3), &Map::new());
        assert!(q.sql.starts_with("SELECT "));
        assert!(q.sql.contains("\"deleted_at\" IS NULL"));
    }

    #[test]
    fn soft_delete_only_touches_live_rows() {
        let t = {
            let reg = registry();
            reg.entity_by_path("tasks").unwrap().clone()
        };
        let q = soft_delete(&t, &json!(3));
        assert!(q.sql.starts_with("UPDATE \"tasks\" SET \"deleted_at\" = NOW()"));
        assert!(q.sql.contains("WHERE \"id\" = $1 AND \"deleted_at\" IS NULL"));
    }

    #[test]
    fn link_insert_carries_edge_attributes() {
        let join = JoinSpec {
            table: "recipe_ingredients".into(),
            owner_fk: "recipe_id".into(),
            related_fk: "ingredient_id".into(),
            edge_columns: vec![
                ColumnDef::required("meassurement_amount"),
                ColumnDef::required("meassurement_type"),
            ],
            edge_validation: {
                let mut m = HashMap::new();
                m.insert("meassurement_amount".into(), ValidationRule::required());
                m
            },
        };
        let edge = json!({"meassurement_amount": 2, "meassurement_type": "cups"})
            .as_object()
            .cloned()
            .unwrap();
        let q = insert_link(&join, &json!(1), &json!(9), &edge);
        assert_eq!(
            q.sql,
            "INSERT INTO \"recipe_ingredients\" (\"recipe_id\", \"ingredient_id\", \"meassurement_amount\", \"meassurement_type\") VALUES ($1, $2, $3, $4) RETURNING *"
        );
        assert_eq!(q.params, vec![json!(1), json!(9), json!(2), json!("cups")]);
    }
}
