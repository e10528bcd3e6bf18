//! PostgreSQL store: executes builder output over sqlx, decoding rows to JSON.

use crate::error::StoreError;
use crate::model::{EntityDef, IncludePlan, JoinSpec};
use crate::sql::{self, PgBindValue, QueryBuf};
use crate::store::{Page, Store};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_err)?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from(p));
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.map(|r| row_to_json(&r)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_all(
        &self,
        entity: &EntityDef,
        includes: &[IncludePlan<'_>],
        page: Page,
    ) -> Result<Vec<Value>, StoreError> {
        const DEFAULT_LIMIT: u32 = 100;
        let limit = page.limit.unwrap_or(DEFAULT_LIMIT).min(1000);
        let q = sql::select_list(entity, includes, Some(limit), Some(page.offset.unwrap_or(0)));
        self.fetch_all(&q).await
    }

    async fn find_by_id(
        &self,
        entity: &EntityDef,
        id: &Value,
        includes: &[IncludePlan<'_>],
    ) -> Result<Option<Value>, StoreError> {
        let q = sql::select_by_id(entity, includes, id);
        self.fetch_optional(&q).await
    }

    async fn create(
        &self,
        entity: &EntityDef,
        fields: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let q = sql::insert(entity, fields);
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend("insert returned no row".into()))
    }

    async fn update(
        &self,
        entity: &EntityDef,
        id: &Value,
        fields: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let q = sql::update(entity, id, fields);
        self.fetch_optional(&q).await
    }

    async fn soft_delete(
        &self,
        entity: &EntityDef,
        id: &Value,
    ) -> Result<Option<Value>, StoreError> {
        let q = sql::soft_delete(entity, id);
        self.fetch_optional(&q).await
    }

    async fn create_link(
        &self,
        join: &JoinSpec,
        owner_id: &Value,
        related_id: &Value,
        edge: &Map<String, Value>,
    ) -> Result<Value, StoreError> {
        let q = sql::insert_link(join, owner_id, related_id, edge);
        self.fetch_optional(&q)
            .await?
            .ok_or_else(|| StoreError::Backend("link insert returned no row".into()))
    }
}

/// SQLSTATE class 23 is integrity constraint violation; surface those as
/// client-caused, everything else as a backend fault.
fn map_sqlx_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().map(|c| c.starts_with("23")).unwrap_or(false) {
            return StoreError::Constraint(db.message().to_string());
        }
    }
    StoreError::Backend(e.to_string())
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
