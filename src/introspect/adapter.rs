//! Loosely-typed JSON metadata → `SchemaSource`.
//!
//! Accepts the shape ORM schema exports usually take: an object of identifier → entry (or an array of
//! entries carrying a `name`). All "is this key present" probing happens here.

use crate::error::SchemaError;
use crate::introspect::metadata::{
    relation_owner, ColumnMeta, ColumnReference, ForeignKeyDescriptor, MetadataEntry, RawColumn, RelationDescriptor,
    SchemaSource, TableMeta,
};
use serde_json::{Map, Value};

impl SchemaSource {
    /// Normalize a JSON metadata dump. Only a non-container top level is an error; anything
    /// unrecognized below it becomes `Other` or `Malformed`.
    pub fn from_json(value: &Value) -> Result<SchemaSource, SchemaError> {
        let entries: Vec<(String, &Value)> = match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let name = str_field(v, &["name", "tableName", "table"]).unwrap_or_else(|| format!("#{}", i));
                    (name, v)
                })
                .collect(),
            other => {
                return Err(SchemaError::Load(format!(
                    "metadata must be an object or array, got {}",
                    type_name_of_json(other)
                )))
            }
        };
        let entries = entries
            .into_iter()
            .map(|(name, v)| {
                let entry = entry_from_json(&name, v);
                (name, entry)
            })
            .collect();
        Ok(SchemaSource { entries })
    }

    pub fn from_json_str(s: &str) -> Result<SchemaSource, SchemaError> {
        let value: Value = serde_json::from_str(s).map_err(|e| SchemaError::Load(e.to_string()))?;
        SchemaSource::from_json(&value)
    }
}

fn entry_from_json(name: &str, v: &Value) -> MetadataEntry {
    let Value::Object(obj) = v else {
        return MetadataEntry::Other(type_name_of_json(v).to_string());
    };
    if let Some(columns) = obj.get("columns") {
        return MetadataEntry::Table(table_from_json(obj, columns));
    }
    if relation_owner(name).is_some() {
        if let Some(relations) = obj.get("relations").or_else(|| obj.get("config")) {
            let relation_names = match relations {
                Value::Array(items) => items.iter().filter_map(|r| r.as_str().map(String::from)).collect(),
                Value::Object(map) => map.keys().cloned().collect(),
                _ => Vec::new(),
            };
            return MetadataEntry::Relations(RelationDescriptor { relation_names });
        }
    }
    MetadataEntry::Other("object".into())
}

fn table_from_json(obj: &Map<String, Value>, columns: &Value) -> TableMeta {
    let columns = match columns {
        Value::Array(items) => items.iter().map(|c| column_from_json(None, c)).collect(),
        Value::Object(map) => map.iter().map(|(k, c)| column_from_json(Some(k), c)).collect(),
        other => vec![RawColumn::Malformed {
            name: None,
            reason: format!("columns must be an object or array, got {}", type_name_of_json(other)),
        }],
    };
    let foreign_keys = obj
        .get("foreignKeys")
        .and_then(Value::as_array)
        .map(|fks| fks.iter().filter_map(|fk| foreign_key_from_json(fk, None)).collect())
        .unwrap_or_default();
    TableMeta {
        table_name: ["tableName", "table", "dbName"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))
            .map(String::from),
        columns,
        foreign_keys,
    }
}

fn column_from_json(key: Option<&str>, v: &Value) -> RawColumn {
    let Value::Object(obj) = v else {
        return RawColumn::Malformed {
            name: key.map(String::from),
            reason: format!("column must be an object, got {}", type_name_of_json(v)),
        };
    };
    let Some(name) = str_field(v, &["name", "columnName"]).or_else(|| key.map(String::from)) else {
        return RawColumn::Malformed {
            name: None,
            reason: "column has no name".into(),
        };
    };
    let data_type = str_field(v, &["dataType", "type", "sqlType", "columnType"]).unwrap_or_default();
    let primary = ["primary", "primaryKey", "isPrimaryKey"]
        .iter()
        .any(|k| obj.get(*k).and_then(Value::as_bool).unwrap_or(false));
    let foreign_keys = obj
        .get("foreignKeys")
        .and_then(Value::as_array)
        .map(|fks| fks.iter().filter_map(|fk| foreign_key_from_json(fk, Some(&name))).collect())
        .unwrap_or_default();
    let references = obj.get("references").and_then(|r| match r {
        Value::String(s) => Some(ColumnReference::Table(s.clone())),
        Value::Object(_) => str_field(r, &["table", "foreignTable", "targetTable"]).map(ColumnReference::Table),
        _ => None,
    });
    RawColumn::Column(ColumnMeta {
        name,
        data_type,
        primary,
        foreign_keys,
        references,
    })
}

/// `"users"` or `{ "columns": [...], "foreignTable": "users" }`. A bare string is a column-level key.
fn foreign_key_from_json(v: &Value, column: Option<&str>) -> Option<ForeignKeyDescriptor> {
    match v {
        Value::String(target) => Some(ForeignKeyDescriptor {
            source_columns: column.map(|c| vec![c.to_string()]).unwrap_or_default(),
            target_table: target.clone(),
        }),
        Value::Object(obj) => {
            let target_table = str_field(v, &["foreignTable", "targetTable", "table", "references"])?;
            let source_columns = ["columns", "sourceColumns"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_array))
                .map(|cols| cols.iter().filter_map(|c| c.as_str().map(String::from)).collect())
                .or_else(|| column.map(|c| vec![c.to_string()]))
                .unwrap_or_default();
            Some(ForeignKeyDescriptor {
                source_columns,
                target_table,
            })
        }
        _ => None,
    }
}

fn str_field(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str))
        .map(String::from)
}

fn type_name_of_json(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
