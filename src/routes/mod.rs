//! Route construction: entity CRUD routes plus common service routes.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::entity_routes;
