//! Entity CRUD routes. Paths are parameterized so handlers resolve the
//! entity (and association) by segment at request time.

use crate::handlers::entity::{create, destroy, link, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:entity", get(list).post(create))
        .route("/:entity/:id", get(read).put(update).delete(destroy))
        .route("/:entity/:id/:association/:related_id", post(link))
        .with_state(state)
}
