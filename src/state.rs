//! Shared application state: the store and the registry are injected
//! explicitly at construction, never reached through a global.

use crate::model::ModelRegistry;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, registry: Arc<ModelRegistry>) -> Self {
        AppState { store, registry }
    }
}
