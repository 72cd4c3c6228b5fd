//! PostgreSQL store: runs the generated SQL against a pool and maps rows to JSON objects.

use crate::config::Resource;
use crate::sql::{delete_where, insert, select_in, select_list, select_where, update_where, PgBindValue, QueryBuf};
use crate::store::{Predicate, Record, Store, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::PgPool;

/// Schema holding the admin tables. From env `ADMINGEN_SCHEMA`, default `public`.
pub fn pg_schema() -> String {
    std::env::var("ADMINGEN_SCHEMA").unwrap_or_else(|_| "public".into())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn predicate_parts(predicate: &Predicate) -> (&str, &Value) {
    match predicate {
        Predicate::Eq { column, value } => (column.as_str(), value),
    }
}

/// Constraint violations become `StoreError::Constraint` carrying the database message.
fn map_db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => return StoreError::Constraint(db.message().to_string()),
            _ => {}
        }
        // undefined_table
        if db.code().as_deref() == Some("42P01") {
            return StoreError::UnknownTable(db.message().to_string());
        }
    }
    StoreError::Db(e)
}

#[async_trait]
impl Store for PgStore {
    async fn find_many(&self, resource: &Resource) -> Result<Vec<Value>, StoreError> {
        self.query_many(&select_list(&self.schema, resource)).await
    }

    async fn find_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError> {
        let (column, value) = predicate_parts(predicate);
        self.query_many(&select_where(&self.schema, resource, column, value)).await
    }

    async fn find_in(&self, resource: &Resource, column: &str, values: &[Value]) -> Result<Vec<Value>, StoreError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.query_many(&select_in(&self.schema, resource, column, values)).await
    }

    async fn insert(&self, resource: &Resource, record: &Record) -> Result<Value, StoreError> {
        let q = insert(&self.schema, resource, record);
        self.query_many(&q)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_where(
        &self,
        resource: &Resource,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<Vec<Value>, StoreError> {
        let (column, value) = predicate_parts(predicate);
        self.query_many(&update_where(&self.schema, resource, column, value, changes)).await
    }

    async fn delete_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError> {
        let (column, value) = predicate_parts(predicate);
        self.query_many(&delete_where(&self.schema, resource, column, value)).await
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode a cell by trying the types the select list can produce. A SQL NULL, or a type none of
/// them accept, becomes JSON null.
fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::from(n);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        return serde_json::Number::from_f64(n as f64).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        return serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
