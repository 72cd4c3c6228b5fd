//! Automatic schema introspection: table metadata in, resource schema out.
//!
//! Every failure below the schema level degrades to "no information" for that table or column;
//! a partial schema is always produced.

pub mod adapter;
pub mod classify;
pub mod metadata;
pub mod postgres;
pub mod resolvers;

use crate::case::to_title_case;
use crate::config::{Field, FieldKind, Resource, ResourceSchema};
use crate::error::IntrospectSkip;
use metadata::{relation_owner, ColumnMeta, MetadataEntry, RawColumn, TableId, TableMeta, TableRegistry};
use resolvers::{resolve_foreign_key, ResolveContext};
use std::collections::{HashMap, HashSet};

pub use classify::classify;
pub use metadata::{ColumnReference, ForeignKeyDescriptor, SchemaSource};

/// A built field plus the scalar kind its column would have had without a relation.
struct IntrospectedField {
    field: Field,
    scalar: Option<FieldKind>,
}

/// Build a resource schema from table metadata alone.
pub fn introspect(source: &SchemaSource) -> ResourceSchema {
    let registry = TableRegistry::from_source(source);
    let relation_names = relation_descriptors(source, &registry);
    let no_relations: Vec<String> = Vec::new();

    let mut seen: HashSet<TableId> = HashSet::new();
    let mut built: Vec<(Resource, Vec<Option<FieldKind>>)> = Vec::new();
    for (name, entry) in &source.entries {
        let meta = match entry {
            MetadataEntry::Table(meta) => meta,
            MetadataEntry::Relations(_) => continue,
            MetadataEntry::Other(kind) => {
                tracing::debug!(entry = %name, kind = %kind, reason = %IntrospectSkip::NotATable(name.clone()), "skipped");
                continue;
            }
        };
        let Some(id) = registry.by_name(name).filter(|id| seen.insert(*id)) else {
            continue;
        };
        let ctx = ResolveContext {
            registry: &registry,
            table: meta,
            relation_names: relation_names.get(&id).unwrap_or(&no_relations),
        };
        match introspect_table(name, &ctx, meta) {
            Ok((resource, fields)) => {
                let scalars = fields.iter().map(|f| f.scalar).collect();
                built.push((
                    Resource {
                        fields: fields.into_iter().map(|f| f.field).collect(),
                        ..resource
                    },
                    scalars,
                ));
            }
            Err(skip) => tracing::debug!(table = %name, reason = %skip, "table skipped"),
        }
    }

    let resources = prune_dangling_relations(built);
    tracing::info!(resources = resources.len(), "schema introspected");
    ResourceSchema::new(resources)
}

/// Relation names per owning table, from descriptors such as `postsRelations`.
fn relation_descriptors(source: &SchemaSource, registry: &TableRegistry) -> HashMap<TableId, Vec<String>> {
    let mut out: HashMap<TableId, Vec<String>> = HashMap::new();
    for (name, entry) in &source.entries {
        let MetadataEntry::Relations(descriptor) = entry else { continue };
        match relation_owner(name).and_then(|owner| registry.lookup(owner)) {
            Some(id) => out
                .entry(id)
                .or_default()
                .extend(descriptor.relation_names.iter().cloned()),
            None => tracing::debug!(entry = %name, "relation descriptor has no owning table"),
        }
    }
    out
}

fn introspect_table(
    name: &str,
    ctx: &ResolveContext<'_>,
    meta: &TableMeta,
) -> Result<(Resource, Vec<IntrospectedField>), IntrospectSkip> {
    let mut fields: Vec<IntrospectedField> = Vec::new();
    let mut columns: HashSet<&str> = HashSet::new();
    for raw in &meta.columns {
        let column = match raw {
            RawColumn::Column(c) => c,
            RawColumn::Malformed { name: col, reason } => {
                let skip = IntrospectSkip::Malformed(format!("{}.{}: {}", name, col.as_deref().unwrap_or("?"), reason));
                tracing::debug!(reason = %skip, "column skipped");
                continue;
            }
        };
        if !columns.insert(column.name.as_str()) {
            tracing::debug!(table = %name, column = %column.name, "duplicate column skipped");
            continue;
        }
        match introspect_column(ctx, column) {
            Ok(mut f) => {
                // composite keys: only the first column is exposed as the primary key
                if f.field.is_primary_key && fields.iter().any(|p| p.field.is_primary_key) {
                    tracing::debug!(table = %name, column = %column.name, "additional primary key column unflagged");
                    f.field.is_primary_key = false;
                }
                fields.push(f);
            }
            Err(skip) => tracing::debug!(table = %name, reason = %skip, "column skipped"),
        }
    }
    if fields.is_empty() {
        return Err(IntrospectSkip::NoFields(name.to_string()));
    }
    let table = ctx
        .registry
        .by_name(name)
        .and_then(|id| ctx.registry.get(id))
        .map(|t| t.table.clone())
        .unwrap_or_else(|| name.to_string());
    let resource = Resource {
        name: name.to_string(),
        label: to_title_case(name),
        fields: Vec::new(),
        table,
    };
    Ok((resource, fields))
}

fn introspect_column(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Result<IntrospectedField, IntrospectSkip> {
    let scalar = classify(&column.data_type);
    let related = resolve_foreign_key(ctx, column).and_then(|res| {
        let target = ctx.registry.get(res.target)?;
        tracing::debug!(column = %column.name, target = %target.name, method = ?res.method, "foreign key resolved");
        Some(target.name.clone())
    });
    let field = match (related, scalar) {
        (Some(target), _) => Field::many_to_one(&column.name, target),
        (None, Some(kind)) => Field::scalar(&column.name, kind),
        (None, None) => {
            return Err(IntrospectSkip::ClassificationSkipped {
                column: column.name.clone(),
                data_type: column.data_type.clone(),
            })
        }
    };
    let mut field = field.with_storage_type(&column.data_type);
    field.is_primary_key = column.primary;
    Ok(IntrospectedField { field, scalar })
}

/// Relations must point at resources that made it into the schema. Demote or drop until stable.
fn prune_dangling_relations(mut built: Vec<(Resource, Vec<Option<FieldKind>>)>) -> Vec<Resource> {
    loop {
        let present: HashSet<String> = built.iter().map(|(r, _)| r.name.clone()).collect();
        let mut changed = false;
        for (resource, scalars) in built.iter_mut() {
            let mut kept_fields = Vec::with_capacity(resource.fields.len());
            let mut kept_scalars = Vec::with_capacity(scalars.len());
            for (field, scalar) in resource.fields.drain(..).zip(scalars.drain(..)) {
                let dangling = field
                    .related_resource
                    .as_ref()
                    .is_some_and(|target| !present.contains(target));
                if !dangling {
                    kept_fields.push(field);
                    kept_scalars.push(scalar);
                    continue;
                }
                changed = true;
                if let Some(kind) = scalar {
                    let mut demoted = Field::scalar(field.name.clone(), kind);
                    demoted.is_primary_key = field.is_primary_key;
                    demoted.storage_type = field.storage_type;
                    kept_fields.push(demoted);
                    kept_scalars.push(Some(kind));
                }
            }
            resource.fields = kept_fields;
            *scalars = kept_scalars;
        }
        built.retain(|(r, _)| {
            if r.fields.is_empty() {
                tracing::debug!(table = %r.name, reason = %IntrospectSkip::NoFields(r.name.clone()), "table skipped");
            }
            !r.fields.is_empty()
        });
        if !changed {
            return built.into_iter().map(|(r, _)| r).collect();
        }
    }
}
