//! Normalized table metadata consumed by the introspector.
//!
//! Adapters (JSON dumps, the PostgreSQL catalog) probe loosely-shaped input and produce these types;
//! inference code only ever matches on them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Table-level or column-level foreign key: source columns referencing a target table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyDescriptor {
    pub source_columns: Vec<String>,
    pub target_table: String,
}

impl ForeignKeyDescriptor {
    pub fn new(source_columns: impl IntoIterator<Item = impl Into<String>>, target_table: impl Into<String>) -> Self {
        ForeignKeyDescriptor {
            source_columns: source_columns.into_iter().map(Into::into).collect(),
            target_table: target_table.into(),
        }
    }
}

pub type ReferenceFn = Arc<dyn Fn() -> Result<Option<String>, String> + Send + Sync>;

/// Column-level "references" accessor.
#[derive(Clone)]
pub enum ColumnReference {
    /// Target table known up front.
    Table(String),
    /// Deferred lookup; may fail, failures count as no reference.
    Lazy(ReferenceFn),
}

impl ColumnReference {
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Result<Option<String>, String> + Send + Sync + 'static,
    {
        ColumnReference::Lazy(Arc::new(f))
    }

    pub fn target(&self) -> Result<Option<String>, String> {
        match self {
            ColumnReference::Table(t) => Ok(Some(t.clone())),
            ColumnReference::Lazy(f) => f(),
        }
    }
}

impl fmt::Debug for ColumnReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnReference::Table(t) => f.debug_tuple("Table").field(t).finish(),
            ColumnReference::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnMeta {
    pub name: String,
    /// Storage type tag as reported by the source (e.g. "integer", "varchar(255)", "string").
    pub data_type: String,
    pub primary: bool,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    pub references: Option<ColumnReference>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        ColumnMeta {
            name: name.into(),
            data_type: data_type.into(),
            primary: false,
            foreign_keys: Vec::new(),
            references: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn foreign_key(mut self, target_table: impl Into<String>) -> Self {
        let fk = ForeignKeyDescriptor::new([self.name.clone()], target_table);
        self.foreign_keys.push(fk);
        self
    }

    pub fn references(mut self, reference: ColumnReference) -> Self {
        self.references = Some(reference);
        self
    }
}

/// A column as handed over by an adapter. Shapes the adapter could not make sense of stay `Malformed`.
#[derive(Clone, Debug)]
pub enum RawColumn {
    Column(ColumnMeta),
    Malformed { name: Option<String>, reason: String },
}

impl From<ColumnMeta> for RawColumn {
    fn from(c: ColumnMeta) -> Self {
        RawColumn::Column(c)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TableMeta {
    /// Storage table name when it differs from the declared identifier.
    pub table_name: Option<String>,
    pub columns: Vec<RawColumn>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableMeta {
    pub fn new(columns: impl IntoIterator<Item = ColumnMeta>) -> Self {
        TableMeta {
            table_name: None,
            columns: columns.into_iter().map(RawColumn::Column).collect(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKeyDescriptor) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_raw_column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }
}

const RELATION_SUFFIXES: [&str; 2] = ["_relations", "Relations"];

/// Owning table identifier of a relation descriptor: "postsRelations" -> "posts".
pub fn relation_owner(identifier: &str) -> Option<&str> {
    RELATION_SUFFIXES
        .iter()
        .find_map(|suffix| identifier.strip_suffix(suffix))
        .filter(|owner| !owner.is_empty())
}

/// Relation descriptor found next to the tables; only lists relation names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub relation_names: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum MetadataEntry {
    Table(TableMeta),
    Relations(RelationDescriptor),
    /// Anything else exported alongside the tables.
    Other(String),
}

/// Ordered metadata entries keyed by declared identifier. Order is declaration order.
#[derive(Clone, Debug, Default)]
pub struct SchemaSource {
    pub entries: Vec<(String, MetadataEntry)>,
}

impl SchemaSource {
    pub fn new() -> Self {
        SchemaSource::default()
    }

    pub fn table(mut self, name: impl Into<String>, table: TableMeta) -> Self {
        self.entries.push((name.into(), MetadataEntry::Table(table)));
        self
    }

    pub fn relations(mut self, name: impl Into<String>, relation_names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let descriptor = RelationDescriptor {
            relation_names: relation_names.into_iter().map(Into::into).collect(),
        };
        self.entries.push((name.into(), MetadataEntry::Relations(descriptor)));
        self
    }

    pub fn other(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.entries.push((name.into(), MetadataEntry::Other(kind.into())));
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableMeta)> {
        self.entries.iter().filter_map(|(name, e)| match e {
            MetadataEntry::Table(t) => Some((name.as_str(), t)),
            _ => None,
        })
    }
}

/// Handle to a registered table: its position in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

#[derive(Clone, Debug)]
pub struct RegisteredTable {
    /// Canonical (declared) name; becomes the resource name.
    pub name: String,
    /// Storage table name.
    pub table: String,
}

/// Bijective mapping between table handles, canonical names and storage table names. Built once.
#[derive(Clone, Debug, Default)]
pub struct TableRegistry {
    tables: Vec<RegisteredTable>,
    by_name: HashMap<String, TableId>,
    by_table: HashMap<String, TableId>,
}

impl TableRegistry {
    pub fn from_source(source: &SchemaSource) -> Self {
        let mut registry = TableRegistry::default();
        for (name, meta) in source.tables() {
            let table = meta.table_name.clone().unwrap_or_else(|| name.to_string());
            if registry.by_name.contains_key(name) || registry.by_table.contains_key(&table) {
                tracing::warn!(table = %name, "duplicate table declaration ignored");
                continue;
            }
            let id = TableId(registry.tables.len());
            registry.by_name.insert(name.to_string(), id);
            registry.by_table.insert(table.clone(), id);
            registry.tables.push(RegisteredTable {
                name: name.to_string(),
                table,
            });
        }
        registry
    }

    pub fn get(&self, id: TableId) -> Option<&RegisteredTable> {
        self.tables.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<TableId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a raw reference (storage table name first, then declared name) to a handle.
    pub fn lookup(&self, reference: &str) -> Option<TableId> {
        self.by_table
            .get(reference)
            .or_else(|| self.by_name.get(reference))
            .copied()
    }

    /// Canonical name for a raw reference.
    pub fn canonical(&self, reference: &str) -> Option<&str> {
        self.lookup(reference)
            .and_then(|id| self.get(id))
            .map(|t| t.name.as_str())
    }

    /// Registered tables in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (TableId, &RegisteredTable)> {
        self.tables.iter().enumerate().map(|(i, t)| (TableId(i), t))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_maps_both_directions() {
        let source = SchemaSource::new()
            .table("users", TableMeta::new([ColumnMeta::new("id", "integer").primary()]))
            .other("default", "object")
            .table(
                "posts",
                TableMeta::new([ColumnMeta::new("id", "integer")]).with_table_name("blog_posts"),
            );
        let registry = TableRegistry::from_source(&source);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.canonical("blog_posts"), Some("posts"));
        assert_eq!(registry.canonical("posts"), Some("posts"));
        assert_eq!(registry.lookup("users"), Some(TableId(0)));
        assert_eq!(registry.get(TableId(1)).map(|t| t.table.as_str()), Some("blog_posts"));
        assert_eq!(registry.canonical("default"), None);
    }

    #[test]
    fn lazy_reference_reports_failure() {
        let ok = ColumnReference::lazy(|| Ok(Some("users".into())));
        let failing = ColumnReference::lazy(|| Err("cyclic import".into()));
        assert_eq!(ok.target(), Ok(Some("users".to_string())));
        assert!(failing.target().is_err());
    }
}
