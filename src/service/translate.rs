//! Payload translation between UI-facing field names and storage columns, plus value coercion.

use crate::config::{Field, FieldKind, Resource, ResourceSchema};
use crate::error::AppError;
use crate::store::Record;
use serde_json::{Number, Value};

/// Translate a create payload into a storage record. A primary key that coerces to null is left out
/// so the store can generate one.
pub fn for_create(schema: &ResourceSchema, resource: &Resource, payload: Value) -> Result<Record, AppError> {
    let mut record = translate(schema, resource, payload)?;
    if let Some(pk) = resource.primary_key() {
        if record.get(pk.column()).is_some_and(Value::is_null) {
            record.remove(pk.column());
        }
    }
    Ok(record)
}

/// Translate an update payload. The primary key is never written.
pub fn for_update(schema: &ResourceSchema, resource: &Resource, payload: Value) -> Result<Record, AppError> {
    let mut record = translate(schema, resource, payload)?;
    if let Some(pk) = resource.primary_key() {
        record.remove(pk.column());
    }
    Ok(record)
}

fn translate(schema: &ResourceSchema, resource: &Resource, payload: Value) -> Result<Record, AppError> {
    let Value::Object(body) = payload else {
        return Err(AppError::BadRequest(format!(
            "{} payload must be a JSON object",
            resource.name
        )));
    };

    let mut record = Record::new();
    // Columns written through their UI name win over the same column sent directly.
    let mut renamed: Vec<&str> = Vec::new();
    for (key, value) in body {
        let field = match resource.field(&key) {
            Some(f) => f,
            None => match resource.field_by_column(&key) {
                Some(f) => f,
                None => {
                    tracing::debug!(resource = %resource.name, key = %key, "dropping unknown payload key");
                    continue;
                }
            },
        };
        let column = field.column();
        if key != column {
            renamed.push(column);
        } else if renamed.contains(&column) {
            continue;
        }
        let value = coerce(schema, field, value)?;
        record.insert(column.to_string(), value);
    }
    Ok(record)
}

/// Coerce one payload value to the field's semantic type.
fn coerce(schema: &ResourceSchema, field: &Field, value: Value) -> Result<Value, AppError> {
    if is_blank(&value) {
        return Ok(Value::Null);
    }
    match field.kind {
        FieldKind::Number => parse_number(&field.name, value),
        FieldKind::Boolean => parse_bool(&field.name, value),
        FieldKind::Relation if holds_number(schema, field) => parse_number(&field.name, value),
        FieldKind::Relation | FieldKind::Text | FieldKind::LongText | FieldKind::Date => Ok(value),
    }
}

/// Numeric fields, and relations whose target primary key is numeric.
fn holds_number(schema: &ResourceSchema, field: &Field) -> bool {
    match field.kind {
        FieldKind::Number => true,
        FieldKind::Relation => field
            .related_resource
            .as_deref()
            .and_then(|r| schema.resource(r))
            .and_then(Resource::primary_key)
            .is_some_and(|pk| pk.kind == FieldKind::Number),
        _ => false,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn parse_number(name: &str, value: Value) -> Result<Value, AppError> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(s) => number_from_str(s.trim())
            .ok_or_else(|| AppError::Validation(format!("{} must be a number, got '{}'", name, s))),
        other => Err(AppError::Validation(format!("{} must be a number, got {}", name, other))),
    }
}

fn number_from_str(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

fn parse_bool(name: &str, value: Value) -> Result<Value, AppError> {
    let parsed = match &value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed
        .map(Value::Bool)
        .ok_or_else(|| AppError::Validation(format!("{} must be a boolean, got {}", name, value)))
}

/// Coerce a path id to the primary key's type. Fails when the resource has no primary key.
pub fn coerce_id<'r>(
    schema: &ResourceSchema,
    resource: &'r Resource,
    id: &str,
) -> Result<(&'r Field, Value), AppError> {
    let pk = resource
        .primary_key()
        .ok_or_else(|| AppError::MissingPrimaryKey(resource.name.clone()))?;
    let value = if holds_number(schema, pk) {
        number_from_str(id.trim())
            .ok_or_else(|| AppError::BadRequest(format!("invalid id '{}' for {}", id, resource.name)))?
    } else {
        Value::String(id.to_string())
    };
    Ok((pk, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        let mut author = Field::many_to_one("author", "users");
        author.foreign_key_column = Some("author_id".into());
        ResourceSchema::new(vec![
            Resource {
                name: "users".into(),
                label: "Users".into(),
                table: "users".into(),
                fields: vec![Field::scalar("id", FieldKind::Number).primary()],
            },
            Resource {
                name: "posts".into(),
                label: "Posts".into(),
                table: "posts".into(),
                fields: vec![
                    Field::scalar("id", FieldKind::Number).primary(),
                    Field::scalar("title", FieldKind::Text),
                    Field::scalar("views", FieldKind::Number),
                    Field::scalar("published", FieldKind::Boolean),
                    author,
                ],
            },
        ])
    }

    fn translate_create(payload: Value) -> Result<Record, AppError> {
        let schema = schema();
        let posts = schema.resource("posts").unwrap();
        for_create(&schema, posts, payload)
    }

    #[test]
    fn moves_ui_names_to_columns_and_parses_numbers() {
        let record = translate_create(json!({ "title": "Hi", "author": "3", "views": "10" })).unwrap();
        assert_eq!(Value::Object(record), json!({ "title": "Hi", "author_id": 3, "views": 10 }));
    }

    #[test]
    fn ui_name_wins_over_raw_column() {
        let record = translate_create(json!({ "author": 1, "author_id": 2 })).unwrap();
        assert_eq!(record["author_id"], 1);
        let record = translate_create(json!({ "author_id": 2, "author": 1 })).unwrap();
        assert_eq!(record["author_id"], 1);
    }

    #[test]
    fn empty_strings_become_null_and_unknown_keys_drop() {
        let record = translate_create(json!({ "id": "", "title": "", "author": "", "junk": 1 })).unwrap();
        assert_eq!(Value::Object(record), json!({ "title": null, "author_id": null }));
    }

    #[test]
    fn rejects_bad_numbers_booleans_and_shapes() {
        assert!(matches!(translate_create(json!({ "views": "many" })), Err(AppError::Validation(_))));
        assert!(matches!(translate_create(json!({ "published": "maybe" })), Err(AppError::Validation(_))));
        assert!(matches!(translate_create(json!([1, 2])), Err(AppError::BadRequest(_))));
        let record = translate_create(json!({ "published": "true" })).unwrap();
        assert_eq!(record["published"], true);
    }

    #[test]
    fn update_never_writes_primary_key() {
        let schema = schema();
        let posts = schema.resource("posts").unwrap();
        let record = for_update(&schema, posts, json!({ "id": 5, "title": "x" })).unwrap();
        assert_eq!(Value::Object(record), json!({ "title": "x" }));
    }

    #[test]
    fn coerces_ids_to_primary_key_type() {
        let schema = schema();
        let posts = schema.resource("posts").unwrap();
        let (pk, id) = coerce_id(&schema, posts, "42").unwrap();
        assert_eq!(pk.name, "id");
        assert_eq!(id, json!(42));
        assert!(matches!(coerce_id(&schema, posts, "abc"), Err(AppError::BadRequest(_))));

        let tags = Resource {
            name: "tags".into(),
            label: "Tags".into(),
            table: "tags".into(),
            fields: vec![Field::scalar("slug", FieldKind::Text)],
        };
        assert!(matches!(coerce_id(&schema, &tags, "x"), Err(AppError::MissingPrimaryKey(_))));
    }

    #[test]
    fn relation_primary_keys_follow_target_key_type() {
        let schema = schema();
        let profiles = Resource {
            name: "profiles".into(),
            label: "Profiles".into(),
            table: "profiles".into(),
            fields: vec![
                Field::many_to_one("user_id", "users").primary(),
                Field::scalar("bio", FieldKind::LongText),
            ],
        };
        let (pk, id) = coerce_id(&schema, &profiles, "5").unwrap();
        assert_eq!(pk.column(), "user_id");
        assert_eq!(id, json!(5));
        assert!(matches!(coerce_id(&schema, &profiles, "abc"), Err(AppError::BadRequest(_))));

        let slugs = Resource {
            fields: vec![Field::many_to_one("tag", "tags").primary()],
            ..profiles
        };
        assert_eq!(coerce_id(&schema, &slugs, "abc").unwrap().1, json!("abc"));
    }
}
