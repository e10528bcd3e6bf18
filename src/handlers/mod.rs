//! HTTP handlers for entity CRUD and association linking.

pub mod entity;

pub use entity::*;
