//! Typed errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Registry construction failures. Raised once, at startup, when entity
/// definitions do not hold together.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("entity '{entity}': association '{association}' references unknown entity '{related}'")]
    UnknownRelated {
        entity: String,
        association: String,
        related: String,
    },
    #[error("entity '{entity}': eager include '{name}' does not name a declared association")]
    UnknownInclude { entity: String, name: String },
    #[error("entity '{entity}': '{column}' is not a declared column")]
    UnknownColumn { entity: String, column: String },
    #[error("entity '{entity}': primary key column '{column}' missing from columns")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("entity '{entity}': system column '{column}' cannot be writable")]
    WritableSystemColumn { entity: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
}

/// Persistence port failures. Constraint violations are client errors
/// (the store enforces NOT NULL / FK / CHECK); everything else is the
/// backend misbehaving.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("storage backend: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("infrastructure: {0}")]
    Infrastructure(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Constraint(msg) => AppError::Validation(msg),
            StoreError::Backend(msg) => AppError::Infrastructure(msg),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "registry_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
