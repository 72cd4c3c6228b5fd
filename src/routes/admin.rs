//! Admin API routes: schema description plus CRUD per resource.
//! Paths are parameterized; handlers resolve the resource by its path segment.

use crate::handlers::resource::{create, delete as delete_handler, list, read, schema, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Request body cap for create/update payloads.
pub const BODY_LIMIT: usize = 1024 * 1024;

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/_schema", get(schema))
        .route("/:resource", get(list).post(create))
        .route("/:resource/:id", get(read).patch(update).delete(delete_handler))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}
