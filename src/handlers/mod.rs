//! HTTP handlers for the schema endpoint and resource CRUD.

pub mod resource;
pub use resource::*;
