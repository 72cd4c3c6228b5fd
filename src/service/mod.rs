//! Handler factory: generic CRUD over a storage accessor, with payload translation.

mod crud;
pub mod translate;
pub use crud::{HandlerMap, HandlerOptions, ResourceHandlers};
