//! Generic resource controller and association edge handler.

mod edge;
mod resource;
mod validation;

pub use edge::EdgeHandler;
pub use resource::ResourceController;
pub use validation::RequestValidator;
