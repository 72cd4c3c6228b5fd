//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a resolved resource.

use crate::config::{Field, FieldKind, Resource};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from resolved schema).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Push a parameter and return its placeholder, cast to the column's storage type when known and
    /// to a type implied by the field kind otherwise.
    fn placeholder(&mut self, field: Option<&Field>, v: Value) -> String {
        let n = self.push_param(v);
        match field.and_then(param_cast) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

fn param_cast(field: &Field) -> Option<&str> {
    if field.storage_type.is_some() {
        return castable(field.storage_type.as_deref());
    }
    match field.kind {
        // date strings are bound as text; timestamptz assigns to date, timestamp and timestamptz columns
        FieldKind::Date => Some("timestamptz"),
        _ => None,
    }
}

/// Storage type usable as a cast target. Anything with characters outside a type name is ignored.
fn castable(storage_type: Option<&str>) -> Option<&str> {
    let t = storage_type?.trim();
    let ok = !t.is_empty()
        && t.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ',' | '.' | '[' | ']'));
    ok.then_some(t)
}

/// Select expression for one column. Text-like and time-of-day columns come back as text, arbitrary
/// precision numerics as float8, so every value decodes without extra type support.
fn select_expr(field: &Field) -> String {
    let q = quoted(field.column());
    let storage = field.storage_type.as_deref().unwrap_or("").to_ascii_lowercase();
    let cast = if matches!(field.kind, FieldKind::Text | FieldKind::LongText) {
        Some("text")
    } else if storage.starts_with("numeric") || storage.starts_with("decimal") {
        Some("float8")
    } else if storage.starts_with("time") && !storage.starts_with("timestamp") {
        Some("text")
    } else {
        None
    };
    match cast {
        Some(c) => format!("{}::{} AS {}", q, c, q),
        None => q,
    }
}

fn select_column_list(resource: &Resource) -> String {
    resource.fields.iter().map(select_expr).collect::<Vec<_>>().join(", ")
}

fn order_clause(resource: &Resource) -> String {
    resource
        .primary_key()
        .map(|pk| format!(" ORDER BY {}", quoted(pk.column())))
        .unwrap_or_default()
}

/// SELECT every row, ordered by primary key when there is one.
pub fn select_list(schema: &str, resource: &Resource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {}{}",
        select_column_list(resource),
        qualified_table(schema, &resource.table),
        order_clause(resource)
    );
    q
}

/// SELECT rows where `column` equals `value`.
pub fn select_where(schema: &str, resource: &Resource, column: &str, value: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(resource.field_by_column(column), value.clone());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}{}",
        select_column_list(resource),
        qualified_table(schema, &resource.table),
        quoted(column),
        ph,
        order_clause(resource)
    );
    q
}

/// SELECT rows where `column` is one of `values`. Used for batch-fetching related rows.
pub fn select_in(schema: &str, resource: &Resource, column: &str, values: &[Value]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &resource.table);
    let cols = select_column_list(resource);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let field = resource.field_by_column(column);
    let placeholders: Vec<String> = values.iter().map(|v| q.placeholder(field, v.clone())).collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}){}",
        cols,
        table,
        quoted(column),
        placeholders.join(", "),
        order_clause(resource)
    );
    q
}

/// INSERT the record's known columns. Columns absent from the record are omitted so the database
/// applies its defaults.
pub fn insert(schema: &str, resource: &Resource, record: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &resource.table);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for field in &resource.fields {
        let Some(val) = record.get(field.column()) else { continue };
        placeholders.push(q.placeholder(Some(field), val.clone()));
        cols.push(quoted(field.column()));
    }
    let returning = select_column_list(resource);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE rows where `column` equals `value`: SET only known, non-key columns present in `changes`.
/// With nothing to set this degrades to a SELECT so the caller still sees which rows matched.
pub fn update_where(
    schema: &str,
    resource: &Resource,
    column: &str,
    value: &Value,
    changes: &Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for field in resource.fields.iter().filter(|f| !f.is_primary_key) {
        let Some(val) = changes.get(field.column()) else { continue };
        let rhs = q.placeholder(Some(field), val.clone());
        sets.push(format!("{} = {}", quoted(field.column()), rhs));
    }
    if sets.is_empty() {
        return select_where(schema, resource, column, value);
    }
    let ph = q.placeholder(resource.field_by_column(column), value.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, &resource.table),
        sets.join(", "),
        quoted(column),
        ph,
        select_column_list(resource)
    );
    q
}

/// DELETE rows where `column` equals `value`, returning them.
pub fn delete_where(schema: &str, resource: &Resource, column: &str, value: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(resource.field_by_column(column), value.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(schema, &resource.table),
        quoted(column),
        ph,
        select_column_list(resource)
    );
    q
}
