//! Typed errors and HTTP mapping.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while validating or loading an explicit resource configuration.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate resource slug: {0}")]
    DuplicateSlug(String),
    #[error("duplicate field '{field}' in resource {resource}")]
    DuplicateField { resource: String, field: String },
    #[error("resource {0} declares no fields")]
    EmptyResource(String),
    #[error("resource {0} declares more than one primary key")]
    MultiplePrimaryKeys(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Reasons an entry or column is left out of an introspected schema. Always recovered locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectSkip {
    #[error("{0} is not a table")]
    NotATable(String),
    #[error("column {column} has unrecognized storage type '{data_type}'")]
    ClassificationSkipped { column: String, data_type: String },
    #[error("malformed column metadata: {0}")]
    Malformed(String),
    #[error("table {0} has no usable columns")]
    NoFields(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("resource {0} has no primary key")]
    MissingPrimaryKey(String),
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: String, id: String },
    #[error("insert into {resource} failed: {reason}")]
    InsertFailed { resource: String, reason: StoreError },
    #[error("update of {resource} failed: {reason}")]
    UpdateFailed { resource: String, reason: StoreError },
    #[error("delete from {resource} failed: {reason}")]
    DeleteFailed { resource: String, reason: StoreError },
    #[error("reading {resource} failed: {source}")]
    Store { resource: String, source: StoreError },
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    /// Machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownResource(_) => "unknown_resource",
            AppError::MissingPrimaryKey(_) => "missing_primary_key",
            AppError::NotFound { .. } => "not_found",
            AppError::InsertFailed { .. } => "insert_failed",
            AppError::UpdateFailed { .. } => "update_failed",
            AppError::DeleteFailed { .. } => "delete_failed",
            AppError::Store { .. } => "store_error",
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::UnknownResource(_) | AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MissingPrimaryKey(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::InsertFailed { .. } | AppError::UpdateFailed { .. } | AppError::DeleteFailed { .. } => {
                StatusCode::CONFLICT
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
