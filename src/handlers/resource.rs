//! Resource CRUD handlers. Each resolves the resource by path segment through the handler map.

use crate::config::ResourceSchema;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

pub async fn schema(State(state): State<AppState>) -> Json<ResourceSchema> {
    Json(state.schema.as_ref().clone())
}

pub async fn list(
    State(state): State<AppState>,
    Path(resource): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    let rows = state.handlers.get(&resource)?.list().await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let row = state.handlers.get(&resource)?.create(body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let found = state.handlers.get(&resource)?.get_by_id(&id).await?;
    match found {
        Some(row) => Ok(Json(row)),
        None => Err(AppError::NotFound { resource, id }),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let row = state.handlers.get(&resource)?.update(&id, body).await?;
    Ok(Json(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let row = state.handlers.get(&resource)?.delete(&id).await?;
    Ok(Json(row))
}
