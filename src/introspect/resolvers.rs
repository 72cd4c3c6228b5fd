//! Foreign-key resolution: independent resolvers tried in a fixed order, first match wins.

use crate::case::{pluralize, strip_id_suffix};
use crate::introspect::metadata::{ColumnMeta, ForeignKeyDescriptor, TableId, TableMeta, TableRegistry};

/// Everything a resolver may look at for one table.
pub struct ResolveContext<'a> {
    pub registry: &'a TableRegistry,
    pub table: &'a TableMeta,
    /// Relation names listed by a relation descriptor attached to this table.
    pub relation_names: &'a [String],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionMethod {
    TableForeignKey,
    ColumnForeignKey,
    ColumnReference,
    RelationDescriptor,
    NamingConvention,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub target: TableId,
    pub method: ResolutionMethod,
}

pub type Resolver = fn(&ResolveContext<'_>, &ColumnMeta) -> Option<TableId>;

/// Resolution order. Earlier entries take priority.
pub const RESOLVERS: [(ResolutionMethod, Resolver); 5] = [
    (ResolutionMethod::TableForeignKey, from_table_foreign_keys),
    (ResolutionMethod::ColumnForeignKey, from_column_foreign_keys),
    (ResolutionMethod::ColumnReference, from_column_reference),
    (ResolutionMethod::RelationDescriptor, from_relation_descriptor),
    (ResolutionMethod::NamingConvention, from_naming_convention),
];

pub fn resolve_foreign_key(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<Resolution> {
    RESOLVERS.iter().find_map(|(method, resolver)| {
        resolver(ctx, column).map(|target| Resolution {
            target,
            method: *method,
        })
    })
}

/// "users" or "users.id" -> registered handle for users.
fn lookup_reference(registry: &TableRegistry, reference: &str) -> Option<TableId> {
    let reference = reference.trim();
    registry.lookup(reference).or_else(|| {
        reference
            .split_once('.')
            .and_then(|(table, _column)| registry.lookup(table))
    })
}

fn first_matching(registry: &TableRegistry, descriptors: &[ForeignKeyDescriptor], column: &str, allow_empty: bool) -> Option<TableId> {
    descriptors
        .iter()
        .filter(|fk| fk.source_columns.iter().any(|c| c == column) || (allow_empty && fk.source_columns.is_empty()))
        .find_map(|fk| lookup_reference(registry, &fk.target_table))
}

pub fn from_table_foreign_keys(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<TableId> {
    first_matching(ctx.registry, &ctx.table.foreign_keys, &column.name, false)
}

pub fn from_column_foreign_keys(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<TableId> {
    first_matching(ctx.registry, &column.foreign_keys, &column.name, true)
}

pub fn from_column_reference(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<TableId> {
    match column.references.as_ref()?.target() {
        Ok(Some(target)) => lookup_reference(ctx.registry, &target),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(column = %column.name, error = %e, "column reference accessor failed");
            None
        }
    }
}

pub fn from_relation_descriptor(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<TableId> {
    if ctx.relation_names.is_empty() {
        return None;
    }
    let base = strip_id_suffix(&column.name).unwrap_or(&column.name);
    let candidate = ctx
        .relation_names
        .iter()
        .find(|r| r.eq_ignore_ascii_case(base))?;
    ctx.registry
        .lookup(candidate)
        .or_else(|| ctx.registry.lookup(&pluralize(candidate)))
}

/// `<base>_id` / `<base>Id` -> first table, in declaration order, named `base`, its plural, or containing it.
/// Known-imprecise: `user_id` matches `superusers` if that table is declared before `users`.
pub fn from_naming_convention(ctx: &ResolveContext<'_>, column: &ColumnMeta) -> Option<TableId> {
    if column.primary {
        return None;
    }
    let base = strip_id_suffix(&column.name)?.to_lowercase();
    let plural = pluralize(&base);
    ctx.registry
        .iter()
        .find(|(_, t)| {
            [t.name.to_lowercase(), t.table.to_lowercase()]
                .iter()
                .any(|name| *name == base || *name == plural || name.contains(&base))
        })
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::metadata::{ColumnReference, SchemaSource};

    fn registry(names: &[&str]) -> TableRegistry {
        let source = names.iter().fold(SchemaSource::new(), |s, n| {
            s.table(*n, TableMeta::new([ColumnMeta::new("id", "integer").primary()]))
        });
        TableRegistry::from_source(&source)
    }

    fn name(registry: &TableRegistry, id: Option<TableId>) -> Option<String> {
        id.and_then(|id| registry.get(id)).map(|t| t.name.clone())
    }

    #[test]
    fn table_descriptor_beats_naming_convention() {
        let reg = registry(&["users", "accounts", "posts"]);
        let table = TableMeta::default().with_foreign_key(ForeignKeyDescriptor::new(["user_id"], "accounts"));
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let column = ColumnMeta::new("user_id", "integer");
        let res = resolve_foreign_key(&ctx, &column).unwrap();
        assert_eq!(res.method, ResolutionMethod::TableForeignKey);
        assert_eq!(name(&reg, Some(res.target)).as_deref(), Some("accounts"));
    }

    #[test]
    fn unknown_descriptor_target_falls_through() {
        let reg = registry(&["users", "posts"]);
        let table = TableMeta::default().with_foreign_key(ForeignKeyDescriptor::new(["user_id"], "ghosts"));
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let res = resolve_foreign_key(&ctx, &ColumnMeta::new("user_id", "integer")).unwrap();
        assert_eq!(res.method, ResolutionMethod::NamingConvention);
        assert_eq!(name(&reg, Some(res.target)).as_deref(), Some("users"));
    }

    #[test]
    fn column_descriptors_and_references() {
        let reg = registry(&["users", "categories"]);
        let table = TableMeta::default();
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };

        let by_fk = ColumnMeta::new("owner", "integer").foreign_key("users");
        assert_eq!(
            resolve_foreign_key(&ctx, &by_fk).map(|r| r.method),
            Some(ResolutionMethod::ColumnForeignKey)
        );

        let by_ref = ColumnMeta::new("kind", "integer").references(ColumnReference::Table("categories.id".into()));
        let res = resolve_foreign_key(&ctx, &by_ref).unwrap();
        assert_eq!(res.method, ResolutionMethod::ColumnReference);
        assert_eq!(name(&reg, Some(res.target)).as_deref(), Some("categories"));
    }

    #[test]
    fn failing_reference_accessor_is_swallowed() {
        let reg = registry(&["users"]);
        let table = TableMeta::default();
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let column = ColumnMeta::new("reviewer", "integer").references(ColumnReference::lazy(|| Err("boom".into())));
        assert_eq!(from_column_reference(&ctx, &column), None);
        assert_eq!(resolve_foreign_key(&ctx, &column), None);
    }

    #[test]
    fn relation_descriptor_enumerates_candidates() {
        let reg = registry(&["people", "authors"]);
        let table = TableMeta::default();
        let names = vec!["author".to_string()];
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &names };
        let column = ColumnMeta::new("authorRef", "integer");
        assert_eq!(from_relation_descriptor(&ctx, &column), None);
        let column = ColumnMeta::new("authorId", "integer");
        assert_eq!(name(&reg, from_relation_descriptor(&ctx, &column)).as_deref(), Some("authors"));
    }

    #[test]
    fn naming_convention_matches_exact_plural_and_substring() {
        let reg = registry(&["category", "users", "superusers"]);
        let table = TableMeta::default();
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let hit = |col: &str| name(&reg, from_naming_convention(&ctx, &ColumnMeta::new(col, "integer")));
        assert_eq!(hit("category_id").as_deref(), Some("category"));
        assert_eq!(hit("user_id").as_deref(), Some("users"));
        assert_eq!(hit("superuserId").as_deref(), Some("superusers"));
        assert_eq!(hit("title"), None);
        assert_eq!(hit("tag_id"), None);
    }

    #[test]
    fn naming_convention_breaks_ties_by_declaration_order() {
        let reg = registry(&["superusers", "users"]);
        let table = TableMeta::default();
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let column = ColumnMeta::new("user_id", "integer");
        assert_eq!(name(&reg, from_naming_convention(&ctx, &column)).as_deref(), Some("superusers"));
    }

    #[test]
    fn naming_convention_skips_primary_keys() {
        let reg = registry(&["users"]);
        let table = TableMeta::default();
        let ctx = ResolveContext { registry: &reg, table: &table, relation_names: &[] };
        let column = ColumnMeta::new("user_id", "integer").primary();
        assert_eq!(from_naming_convention(&ctx, &column), None);
    }
}
