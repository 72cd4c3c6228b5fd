//! Raw config types for explicitly configured admin resources (camelCase JSON).

use crate::config::FieldKind;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub is_id: bool,
    /// Slug of the related resource (relation fields only).
    #[serde(default)]
    pub relation_to: Option<String>,
    /// Storage column carrying the reference; defaults to `name`.
    #[serde(default)]
    pub foreign_key: Option<String>,
    /// Storage type tag used for parameter casts.
    #[serde(default)]
    pub storage_type: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    pub slug: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Storage table; defaults to `slug`.
    #[serde(default)]
    pub table: Option<String>,
    pub fields: Vec<FieldConfig>,
}

impl ResourceConfig {
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.slug)
    }
}

/// Master config. When present, resources are taken verbatim and no inference runs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub resources: Vec<ResourceConfig>,
}
