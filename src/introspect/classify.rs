//! Storage type → UI field kind.

use crate::config::FieldKind;

/// Lowercased base name of a storage type tag: "VARCHAR(255)" -> "varchar", "int4[]" stays unrecognized.
fn base_type(data_type: &str) -> String {
    let lower = data_type.trim().to_lowercase();
    match lower.find('(') {
        Some(i) => {
            let (head, tail) = lower.split_at(i);
            // keep modifiers after the parenthesis, e.g. "timestamp(3) with time zone"
            let rest = tail.find(')').map(|j| &tail[j + 1..]).unwrap_or("");
            format!("{}{}", head.trim_end(), rest)
        }
        None => lower,
    }
}

/// Classify a storage type into a scalar field kind. `None` means the column is dropped.
pub fn classify(data_type: &str) -> Option<FieldKind> {
    let ty = base_type(data_type);
    let kind = match ty.as_str() {
        "longtext" | "mediumtext" | "clob" | "long_text" | "textarea" => FieldKind::LongText,
        "string" | "text" | "varchar" | "char" | "character" | "character varying" | "bpchar" | "citext"
        | "nvarchar" | "nchar" | "tinytext" | "uuid" | "name" => FieldKind::Text,
        "number" | "integer" | "int" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "tinyint"
        | "mediumint" | "serial" | "smallserial" | "bigserial" | "serial4" | "serial8" | "numeric"
        | "decimal" | "real" | "float" | "float4" | "float8" | "double" | "double precision" => {
            FieldKind::Number
        }
        "boolean" | "bool" => FieldKind::Boolean,
        "date" | "datetime" | "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" | "time" | "timetz" | "time with time zone"
        | "time without time zone" => FieldKind::Date,
        _ => return None,
    };
    Some(kind)
}
