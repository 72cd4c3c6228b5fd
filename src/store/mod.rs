//! Storage accessor: the primitives the handler factory needs from a persistence layer.

pub mod memory;
pub mod postgres;

use crate::config::Resource;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A record keyed by storage column.
pub type Record = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq { column: String, value: Value },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Predicate::Eq {
            column: column.into(),
            value,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness, foreign-key, not-null or check violation.
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    #[error("store lock poisoned")]
    Lock,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// Query and mutation primitives, addressed by resource. Records go in and come out as JSON objects
/// keyed by storage column.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_many(&self, resource: &Resource) -> Result<Vec<Value>, StoreError>;

    async fn find_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError>;

    /// Rows whose `column` is one of `values`. Used to expand relations; optional.
    async fn find_in(&self, _resource: &Resource, _column: &str, _values: &[Value]) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Unsupported("find_in"))
    }

    /// Insert one row and return it as stored, including generated values.
    async fn insert(&self, resource: &Resource, record: &Record) -> Result<Value, StoreError>;

    async fn update_where(
        &self,
        resource: &Resource,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<Vec<Value>, StoreError>;

    async fn delete_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError>;
}

/// Key used to match values across records: strings as-is, everything else by its JSON text.
pub(crate) fn value_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
