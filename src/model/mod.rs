//! Entity definitions and the explicit model registry.

pub mod registry;
pub mod types;

pub use registry::{IncludePlan, IncludeShape, ModelRegistry};
pub use types::*;
