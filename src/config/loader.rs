//! Config-driven schema resolution, config file loading, and mode selection.

use crate::case::to_title_case;
use crate::config::types::*;
use crate::config::{validate, Field, FieldKind, RelationCardinality, Resource, ResourceSchema};
use crate::error::SchemaError;
use crate::introspect::{introspect, SchemaSource};
use std::path::Path;

/// Build the resource schema. Explicit configuration wins; otherwise the metadata is introspected.
pub fn build_schema(source: &SchemaSource, config: Option<&AdminConfig>) -> Result<ResourceSchema, SchemaError> {
    match config {
        Some(config) => resolve(config),
        None => Ok(introspect(source)),
    }
}

/// Build resource schema from explicit config (validates first). No inference.
pub fn resolve(config: &AdminConfig) -> Result<ResourceSchema, SchemaError> {
    validate(config)?;

    let resources = config
        .resources
        .iter()
        .map(|r| Resource {
            name: r.slug.clone(),
            label: r.label.clone().unwrap_or_else(|| to_title_case(&r.slug)),
            table: r.table_name().to_string(),
            fields: r.fields.iter().map(field_from_config).collect(),
        })
        .collect::<Vec<_>>();

    tracing::info!(resources = resources.len(), "schema resolved from config");
    Ok(ResourceSchema::new(resources))
}

fn field_from_config(f: &FieldConfig) -> Field {
    let is_relation = f.kind == FieldKind::Relation;
    Field {
        name: f.name.clone(),
        label: f.label.clone().unwrap_or_else(|| f.name.clone()),
        kind: f.kind,
        is_primary_key: f.is_id,
        related_resource: f.relation_to.clone(),
        relation_cardinality: is_relation.then_some(RelationCardinality::ManyToOne),
        foreign_key_column: is_relation.then(|| f.foreign_key.clone().unwrap_or_else(|| f.name.clone())),
        storage_type: f.storage_type.clone(),
    }
}

/// Load an admin config from a JSON file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<AdminConfig, SchemaError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::metadata::{ColumnMeta, TableMeta};
    use serde_json::json;

    fn blog_config() -> AdminConfig {
        serde_json::from_value(json!({ "resources": [
            { "slug": "users", "fields": [
                { "name": "id", "type": "number", "isId": true },
                { "name": "email", "type": "text", "label": "E-mail" }
            ]},
            { "slug": "posts", "label": "Articles", "table": "blog_posts", "fields": [
                { "name": "id", "type": "number", "isId": true },
                { "name": "author", "type": "relationship", "relationTo": "users", "foreignKey": "authorId" },
                { "name": "body", "type": "textarea" }
            ]}
        ]}))
        .unwrap()
    }

    #[test]
    fn copies_config_without_inference() {
        let schema = resolve(&blog_config()).unwrap();
        let users = schema.resource("users").unwrap();
        assert_eq!(users.label, "Users");
        assert_eq!(users.fields[1].label, "E-mail");

        let posts = schema.resource("posts").unwrap();
        assert_eq!(posts.label, "Articles");
        assert_eq!(posts.table, "blog_posts");
        let author = posts.field("author").unwrap();
        assert_eq!(author.related_resource.as_deref(), Some("users"));
        assert_eq!(author.foreign_key_column.as_deref(), Some("authorId"));
        assert_eq!(author.relation_cardinality, Some(RelationCardinality::ManyToOne));
        assert_eq!(posts.field("body").unwrap().kind, FieldKind::LongText);
        assert!(posts.field("body").unwrap().foreign_key_column.is_none());
    }

    #[test]
    fn config_takes_precedence_over_metadata() {
        let source = SchemaSource::new().table(
            "comments",
            TableMeta::new([ColumnMeta::new("id", "integer").primary()]),
        );
        let config = blog_config();
        let schema = build_schema(&source, Some(&config)).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["users", "posts"]);

        let schema = build_schema(&source, None).unwrap();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["comments"]);
    }

    #[tokio::test]
    async fn load_from_missing_path_fails() {
        let err = load_from_path("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, SchemaError::Load(_)));
    }
}
