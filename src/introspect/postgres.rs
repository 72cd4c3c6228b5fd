//! Load table metadata for one PostgreSQL schema from the system catalogs.

use crate::config::ColumnTypes;
use crate::error::SchemaError;
use crate::introspect::metadata::{ColumnMeta, ForeignKeyDescriptor, MetadataEntry, SchemaSource, TableMeta};
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};

/// Relations in creation (oid) order, which stands in for declaration order. Partitions are left to
/// their parent table.
const TABLES_SQL: &str = r#"
    SELECT c.relname::text,
           CASE WHEN c.relkind IN ('r', 'p') THEN 'BASE TABLE'
                WHEN c.relkind = 'v' THEN 'VIEW'
                WHEN c.relkind = 'm' THEN 'MATERIALIZED VIEW'
                ELSE 'FOREIGN' END
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind IN ('r', 'p', 'v', 'm', 'f') AND NOT c.relispartition
    ORDER BY c.oid
"#;

const COLUMNS_SQL: &str = r#"
    SELECT table_name::text, column_name::text, udt_name::text
    FROM information_schema.columns
    WHERE table_schema = $1
    ORDER BY table_name, ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
    SELECT kcu.table_name::text, kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1
    ORDER BY kcu.table_name, kcu.ordinal_position
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT tc.constraint_name::text, kcu.table_name::text, kcu.column_name::text, ccu.table_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.constraint_schema
    WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
    ORDER BY tc.constraint_name, kcu.ordinal_position
"#;

/// Read tables, columns, primary keys and foreign keys of `schema`. Views are reported as non-tables.
pub async fn load_source(pool: &PgPool, schema: &str) -> Result<SchemaSource, SchemaError> {
    let tables: Vec<(String, String)> = fetch(pool, TABLES_SQL, schema).await?;
    let columns: Vec<(String, String, String)> = fetch(pool, COLUMNS_SQL, schema).await?;
    let primary_keys: Vec<(String, String)> = fetch(pool, PRIMARY_KEYS_SQL, schema).await?;
    let foreign_keys: Vec<(String, String, String, String)> = fetch(pool, FOREIGN_KEYS_SQL, schema).await?;

    let primary: HashSet<(String, String)> = primary_keys.into_iter().collect();

    let mut columns_by_table: HashMap<String, Vec<ColumnMeta>> = HashMap::new();
    for (table, column, udt) in columns {
        let mut meta = ColumnMeta::new(column.clone(), udt);
        meta.primary = primary.contains(&(table.clone(), column));
        columns_by_table.entry(table).or_default().push(meta);
    }

    let mut fks_by_table: HashMap<String, Vec<(String, ForeignKeyDescriptor)>> = HashMap::new();
    for (constraint, table, column, target) in foreign_keys {
        let fks = fks_by_table.entry(table).or_default();
        match fks.iter_mut().find(|(name, _)| *name == constraint) {
            Some((_, fk)) => {
                if !fk.source_columns.contains(&column) {
                    fk.source_columns.push(column);
                }
            }
            None => fks.push((constraint, ForeignKeyDescriptor::new([column], target))),
        }
    }

    let mut source = SchemaSource::new();
    for (table, table_type) in tables {
        if table_type != "BASE TABLE" {
            source.entries.push((table, MetadataEntry::Other(table_type.to_lowercase())));
            continue;
        }
        let mut meta = TableMeta::new(columns_by_table.remove(&table).unwrap_or_default());
        meta.foreign_keys = fks_by_table
            .remove(&table)
            .unwrap_or_default()
            .into_iter()
            .map(|(_, fk)| fk)
            .collect();
        source = source.table(table, meta);
    }
    tracing::debug!(schema = %schema, entries = source.entries.len(), "catalog loaded");
    Ok(source)
}

/// Storage type of every column in `schema`, by table then column. Used to give configured resources
/// the parameter casts introspected ones get from their metadata.
pub async fn load_column_types(pool: &PgPool, schema: &str) -> Result<ColumnTypes, SchemaError> {
    let columns: Vec<(String, String, String)> = fetch(pool, COLUMNS_SQL, schema).await?;
    let mut types = ColumnTypes::new();
    for (table, column, udt) in columns {
        types.entry(table).or_default().insert(column, udt);
    }
    Ok(types)
}

async fn fetch<T>(pool: &PgPool, sql: &str, schema: &str) -> Result<Vec<T>, SchemaError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    tracing::debug!(sql = %sql.trim(), schema = %schema, "query");
    sqlx::query_as::<_, T>(sql)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| SchemaError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_listed_in_creation_order() {
        let sql = TABLES_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.ends_with("ORDER BY c.oid"));
        assert!(!sql.contains("ORDER BY table_name"));
        assert!(sql.contains("NOT c.relispartition"));
    }
}
