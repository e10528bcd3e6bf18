//! Entity CRUD handlers: resolve the entity by path segment, shape the
//! body, run the controller, map the result onto status + JSON.

use crate::case;
use crate::controller::{EdgeHandler, ResourceController};
use crate::error::AppError;
use crate::model::EntityDef;
use crate::response::{success_many, success_one};
use crate::state::AppState;
use crate::store::Page;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn resolve<'a>(state: &'a AppState, segment: &str) -> Result<&'a EntityDef, AppError> {
    state
        .registry
        .entity_by_path(segment)
        .ok_or_else(|| AppError::NotFound(segment.to_string()))
}

/// Request bodies must be JSON objects; keys arrive camelCase and are
/// converted to column names before the controller sees them.
fn body_to_fields(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(mut m) => {
            case::object_keys_to_snake_case(&mut m);
            Ok(m)
        }
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn page_from_params(params: &HashMap<String, String>) -> Page {
    Page {
        limit: params.get("limit").and_then(|v| v.parse().ok()),
        offset: params.get("offset").and_then(|v| v.parse().ok()),
    }
}

fn camelized(mut row: Value) -> Value {
    case::value_keys_to_camel_case(&mut row);
    row
}

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let controller = ResourceController::new(&state.registry, entity, state.store.as_ref());
    let rows = controller.list(page_from_params(&params)).await?;
    Ok(success_many(rows.into_iter().map(camelized).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let controller = ResourceController::new(&state.registry, entity, state.store.as_ref());
    let row = controller.create(body_to_fields(body)?).await?;
    Ok(success_one(camelized(row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id_raw)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let id = entity.pk_type.parse_id(&id_raw)?;
    let controller = ResourceController::new(&state.registry, entity, state.store.as_ref());
    let row = controller.get(&id).await?;
    Ok(success_one(camelized(row)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id_raw)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let id = entity.pk_type.parse_id(&id_raw)?;
    let controller = ResourceController::new(&state.registry, entity, state.store.as_ref());
    let row = controller.update(&id, body_to_fields(body)?).await?;
    Ok(success_one(camelized(row)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((segment, id_raw)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let id = entity.pk_type.parse_id(&id_raw)?;
    let controller = ResourceController::new(&state.registry, entity, state.store.as_ref());
    controller.destroy(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /:entity/:id/:association/:related_id — the body, when present,
/// carries edge attributes for many-to-many links.
pub async fn link(
    State(state): State<AppState>,
    Path((segment, id_raw, association, related_id_raw)): Path<(String, String, String, String)>,
    body: Option<Json<Value>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resolve(&state, &segment)?;
    let id = entity.pk_type.parse_id(&id_raw)?;
    let edge = match body {
        Some(Json(v)) => body_to_fields(v)?,
        None => Map::new(),
    };
    let handler = EdgeHandler::new(&state.registry, entity, state.store.as_ref());
    let row = handler.link(&id, &association, &related_id_raw, edge).await?;
    Ok(success_one(camelized(row)))
}
