//! Admingen: schema introspection, relationship inference and generic CRUD handlers for admin UIs.

pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod introspect;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{build_schema, load_from_path, resolve, AdminConfig, Field, FieldKind, Resource, ResourceSchema};
pub use error::{AppError, IntrospectSkip, SchemaError};
pub use introspect::{introspect, SchemaSource};
pub use routes::admin_routes;
pub use service::{HandlerMap, HandlerOptions, ResourceHandlers};
pub use state::AppState;
pub use store::{MemoryStore, PgStore, Predicate, Store, StoreError};
