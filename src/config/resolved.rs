//! Resolved resource schema: the immutable, UI-facing description of every resource and field.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// UI field kind. Closed set; storage types map onto it through classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    #[serde(alias = "textarea")]
    LongText,
    Number,
    Boolean,
    Date,
    #[serde(alias = "relationship")]
    Relation,
}

impl FieldKind {
    pub fn is_relation(self) -> bool {
        matches!(self, FieldKind::Relation)
    }
}

/// Only cardinality the introspector infers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationCardinality {
    ManyToOne,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_cardinality: Option<RelationCardinality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key_column: Option<String>,
    /// Raw storage type tag (e.g. "int4", "timestamptz"), used for parameter casts.
    #[serde(skip)]
    pub storage_type: Option<String>,
}

impl Field {
    pub fn scalar(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Field {
            label: name.clone(),
            name,
            kind,
            is_primary_key: false,
            related_resource: None,
            relation_cardinality: None,
            foreign_key_column: None,
            storage_type: None,
        }
    }

    /// Many-to-one relation whose UI name and foreign-key column coincide.
    pub fn many_to_one(column: impl Into<String>, related: impl Into<String>) -> Self {
        let column = column.into();
        Field {
            label: column.clone(),
            name: column.clone(),
            kind: FieldKind::Relation,
            is_primary_key: false,
            related_resource: Some(related.into()),
            relation_cardinality: Some(RelationCardinality::ManyToOne),
            foreign_key_column: Some(column),
            storage_type: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn with_storage_type(mut self, storage_type: impl Into<String>) -> Self {
        self.storage_type = Some(storage_type.into());
        self
    }

    /// Storage column backing this field.
    pub fn column(&self) -> &str {
        self.foreign_key_column.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    pub label: String,
    pub fields: Vec<Field>,
    /// Storage table backing the resource.
    #[serde(skip)]
    pub table: String,
}

impl Resource {
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.column() == column)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind.is_relation())
    }

    /// Storage columns in field order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::column)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResourceSchema {
    pub resources: Vec<Resource>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl ResourceSchema {
    pub fn new(resources: Vec<Resource>) -> Self {
        let by_name = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        ResourceSchema { resources, by_name }
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.by_name.get(name).map(|&i| &self.resources[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Fill missing storage types from a catalog listing. Types already set are kept.
    pub fn fill_storage_types(&mut self, types: &ColumnTypes) {
        for resource in &mut self.resources {
            let Some(columns) = types.get(&resource.table) else {
                tracing::debug!(resource = %resource.name, table = %resource.table, "no catalog entry for table");
                continue;
            };
            for field in resource.fields.iter_mut().filter(|f| f.storage_type.is_none()) {
                field.storage_type = columns.get(field.column()).cloned();
            }
        }
    }
}

/// Storage type tags by table, then column.
pub type ColumnTypes = HashMap<String, HashMap<String, String>>;
