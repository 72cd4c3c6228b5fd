//! Config validation: referential integrity and per-resource consistency.

use crate::config::{AdminConfig, FieldKind};
use crate::error::SchemaError;
use std::collections::HashSet;

pub fn validate(config: &AdminConfig) -> Result<(), SchemaError> {
    if config.resources.is_empty() {
        return Err(SchemaError::Validation("at least one resource required".into()));
    }

    let mut slugs = HashSet::new();
    for r in &config.resources {
        if r.slug.trim().is_empty() {
            return Err(SchemaError::Validation("resource slug must not be empty".into()));
        }
        if !slugs.insert(r.slug.as_str()) {
            return Err(SchemaError::DuplicateSlug(r.slug.clone()));
        }
    }

    for r in &config.resources {
        if r.fields.is_empty() {
            return Err(SchemaError::EmptyResource(r.slug.clone()));
        }
        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        let mut pk_count = 0;
        for f in &r.fields {
            let column = f.foreign_key.as_deref().unwrap_or(&f.name);
            if !names.insert(f.name.as_str()) || !columns.insert(column) {
                return Err(SchemaError::DuplicateField {
                    resource: r.slug.clone(),
                    field: f.name.clone(),
                });
            }
            if f.is_id {
                pk_count += 1;
            }
            match (f.kind, f.relation_to.as_deref()) {
                (FieldKind::Relation, None) => {
                    return Err(SchemaError::Validation(format!(
                        "{}.{}: relation field requires relationTo",
                        r.slug, f.name
                    )));
                }
                (FieldKind::Relation, Some(target)) => {
                    if !slugs.contains(target) {
                        return Err(SchemaError::MissingReference {
                            kind: "resource",
                            id: target.to_string(),
                        });
                    }
                }
                (_, Some(_)) => {
                    return Err(SchemaError::Validation(format!(
                        "{}.{}: relationTo is only allowed on relation fields",
                        r.slug, f.name
                    )));
                }
                (_, None) => {}
            }
        }
        if pk_count > 1 {
            return Err(SchemaError::MultiplePrimaryKeys(r.slug.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> AdminConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accepts_well_formed_config() {
        let cfg = config(json!({ "resources": [
            { "slug": "users", "fields": [{ "name": "id", "type": "number", "isId": true }] },
            { "slug": "posts", "fields": [
                { "name": "id", "type": "number", "isId": true },
                { "name": "author", "type": "relation", "relationTo": "users", "foreignKey": "author_id" }
            ]}
        ]}));
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn rejects_dangling_relation() {
        let cfg = config(json!({ "resources": [
            { "slug": "posts", "fields": [
                { "name": "author_id", "type": "relation", "relationTo": "users" }
            ]}
        ]}));
        assert!(matches!(
            validate(&cfg),
            Err(SchemaError::MissingReference { kind: "resource", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_slugs_and_fields() {
        let dup_slug = config(json!({ "resources": [
            { "slug": "a", "fields": [{ "name": "id", "type": "number" }] },
            { "slug": "a", "fields": [{ "name": "id", "type": "number" }] }
        ]}));
        assert!(matches!(validate(&dup_slug), Err(SchemaError::DuplicateSlug(s)) if s == "a"));

        let dup_field = config(json!({ "resources": [
            { "slug": "a", "fields": [
                { "name": "x", "type": "text" },
                { "name": "x", "type": "number" }
            ]}
        ]}));
        assert!(matches!(validate(&dup_field), Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn rejects_two_primary_keys_and_empty_resources() {
        let two_pks = config(json!({ "resources": [
            { "slug": "a", "fields": [
                { "name": "x", "type": "number", "isId": true },
                { "name": "y", "type": "number", "isId": true }
            ]}
        ]}));
        assert!(matches!(validate(&two_pks), Err(SchemaError::MultiplePrimaryKeys(_))));

        let empty = config(json!({ "resources": [{ "slug": "a", "fields": [] }] }));
        assert!(matches!(validate(&empty), Err(SchemaError::EmptyResource(_))));
    }
}
