//! In-process store: ordered rows per table behind a lock. Generates primary keys and enforces
//! primary-key and declared unique constraints.

use crate::config::{FieldKind, Resource};
use crate::store::{value_key, Predicate, Record, Store, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    unique: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Declare a unique column on a storage table.
    pub fn with_unique(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.unique.entry(table.into()).or_default().push(column.into());
        self
    }

    /// Rows currently stored for a table, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .map(|t| t.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn unique_columns<'a>(&'a self, resource: &'a Resource) -> Vec<&'a str> {
        let mut cols: Vec<&str> = resource.primary_key().map(|pk| pk.column()).into_iter().collect();
        if let Some(extra) = self.unique.get(&resource.table) {
            cols.extend(extra.iter().map(String::as_str));
        }
        cols
    }

    /// Fails when `candidate` collides with any of `others` on a unique column.
    fn check_unique<'r>(
        &self,
        resource: &Resource,
        candidate: &Record,
        others: impl Iterator<Item = &'r Record>,
    ) -> Result<(), StoreError> {
        let columns = self.unique_columns(resource);
        for other in others {
            for col in &columns {
                match (candidate.get(*col), other.get(*col)) {
                    (Some(a), Some(b)) if !a.is_null() && value_key(a) == value_key(b) => {
                        return Err(StoreError::Constraint(format!(
                            "duplicate value {} for unique column {}.{}",
                            a, resource.table, col
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

fn matches(row: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq { column, value } => row.get(column).is_some_and(|v| !v.is_null() && value_key(v) == value_key(value)),
    }
}

fn next_id(rows: &[Record], column: &str) -> Value {
    let max = rows
        .iter()
        .filter_map(|r| r.get(column).and_then(Value::as_i64))
        .max()
        .unwrap_or(0);
    Value::from(max + 1)
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_many(&self, resource: &Resource) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Lock)?;
        Ok(tables
            .get(&resource.table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default())
    }

    async fn find_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Lock)?;
        Ok(tables
            .get(&resource.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches(r, predicate))
                    .cloned()
                    .map(Value::Object)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_in(&self, resource: &Resource, column: &str, values: &[Value]) -> Result<Vec<Value>, StoreError> {
        let wanted: HashSet<String> = values.iter().map(value_key).collect();
        let tables = self.tables.read().map_err(|_| StoreError::Lock)?;
        Ok(tables
            .get(&resource.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.get(column).is_some_and(|v| !v.is_null() && wanted.contains(&value_key(v))))
                    .cloned()
                    .map(Value::Object)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, resource: &Resource, record: &Record) -> Result<Value, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Lock)?;
        let rows = tables.entry(resource.table.clone()).or_default();

        let mut row = Record::new();
        for col in resource.columns() {
            row.insert(col.to_string(), record.get(col).cloned().unwrap_or(Value::Null));
        }
        if let Some(pk) = resource.primary_key() {
            let col = pk.column();
            if row.get(col).map_or(true, Value::is_null) {
                let generated = match pk.kind {
                    FieldKind::Number => next_id(rows, col),
                    FieldKind::Text | FieldKind::LongText => Value::String(uuid::Uuid::new_v4().to_string()),
                    _ => {
                        return Err(StoreError::Constraint(format!(
                            "null value in primary key column {}.{}",
                            resource.table, col
                        )))
                    }
                };
                row.insert(col.to_string(), generated);
            }
        }
        self.check_unique(resource, &row, rows.iter())?;
        rows.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update_where(
        &self,
        resource: &Resource,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<Vec<Value>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Lock)?;
        let Some(rows) = tables.get_mut(&resource.table) else {
            return Ok(Vec::new());
        };
        let known: HashSet<&str> = resource.columns().collect();

        let mut updated: Vec<(usize, Record)> = Vec::new();
        for (i, row) in rows.iter().enumerate().filter(|(_, r)| matches(r, predicate)) {
            let mut next = row.clone();
            for (k, v) in changes.iter().filter(|(k, _)| known.contains(k.as_str())) {
                next.insert(k.clone(), v.clone());
            }
            let others = rows.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, r)| r);
            self.check_unique(resource, &next, others)?;
            updated.push((i, next));
        }
        for (i, next) in &updated {
            rows[*i] = next.clone();
        }
        Ok(updated.into_iter().map(|(_, r)| Value::Object(r)).collect())
    }

    async fn delete_where(&self, resource: &Resource, predicate: &Predicate) -> Result<Vec<Value>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Lock)?;
        let Some(rows) = tables.get_mut(&resource.table) else {
            return Ok(Vec::new());
        };
        let mut removed = Vec::new();
        rows.retain(|r| {
            if matches(r, predicate) {
                removed.push(Value::Object(r.clone()));
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Field;
    use serde_json::json;

    fn users() -> Resource {
        Resource {
            name: "users".into(),
            label: "Users".into(),
            table: "users".into(),
            fields: vec![
                Field::scalar("id", FieldKind::Number).primary(),
                Field::scalar("email", FieldKind::Text),
            ],
        }
    }

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn generates_sequential_ids_and_fills_missing_columns() {
        let store = MemoryStore::new();
        let a = store.insert(&users(), &record(json!({ "email": "a@x" }))).await.unwrap();
        let b = store.insert(&users(), &record(json!({}))).await.unwrap();
        assert_eq!(a, json!({ "id": 1, "email": "a@x" }));
        assert_eq!(b, json!({ "id": 2, "email": null }));
    }

    #[tokio::test]
    async fn enforces_unique_columns() {
        let store = MemoryStore::new().with_unique("users", "email");
        store.insert(&users(), &record(json!({ "email": "a@x" }))).await.unwrap();
        let err = store.insert(&users(), &record(json!({ "email": "a@x" }))).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let err = store.insert(&users(), &record(json!({ "id": 1 }))).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn update_rejects_collisions_without_partial_writes() {
        let store = MemoryStore::new().with_unique("users", "email");
        store.insert(&users(), &record(json!({ "email": "a@x" }))).await.unwrap();
        store.insert(&users(), &record(json!({ "email": "b@x" }))).await.unwrap();
        let err = store
            .update_where(&users(), &Predicate::eq("id", json!(2)), &record(json!({ "email": "a@x" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.rows("users")[1]["email"], "b@x");
    }

    #[tokio::test]
    async fn find_in_matches_across_value_types() {
        let store = MemoryStore::new();
        store.insert(&users(), &record(json!({ "email": "a@x" }))).await.unwrap();
        store.insert(&users(), &record(json!({ "email": "b@x" }))).await.unwrap();
        let found = store.find_in(&users(), "id", &[json!(2), json!("7")]).await.unwrap();
        assert_eq!(found, vec![json!({ "id": 2, "email": "b@x" })]);
    }
}
