//! crudkit: registry-driven REST CRUD with relational associations.
//!
//! Entities and their associations (belongs-to, has-one, has-many,
//! many-to-many) are described by an explicit [`ModelRegistry`]; one
//! generic [`ResourceController`] serves every entity, an [`EdgeHandler`]
//! creates links, and a [`Store`] trait abstracts the relational backend.

pub mod case;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod store;

pub use controller::{EdgeHandler, RequestValidator, ResourceController};
pub use error::{AppError, RegistryError, StoreError};
pub use model::{
    AssociationDef, AssociationKind, ColumnDef, EntityDef, IncludePlan, IncludeShape, JoinSpec,
    ModelRegistry, PkType, ValidationRule,
};
pub use response::{success_many, success_one};
pub use routes::{common_routes, entity_routes};
pub use state::AppState;
pub use store::{MemoryStore, Page, PgStore, Store};
