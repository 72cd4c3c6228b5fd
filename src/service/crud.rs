//! Handler factory: per-resource list/get/create/update/delete over a `Store`.

use crate::case::strip_id_suffix;
use crate::config::{Field, Resource, ResourceSchema};
use crate::error::AppError;
use crate::service::translate::{coerce_id, for_create, for_update};
use crate::store::{value_key, Predicate, Store, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct HandlerOptions {
    /// Attach related records one level deep on list/get.
    pub expand_relations: bool,
}

/// The five operations for one resource, bound to the shared schema and store.
#[derive(Clone)]
pub struct ResourceHandlers {
    schema: Arc<ResourceSchema>,
    index: usize,
    store: Arc<dyn Store>,
    options: HandlerOptions,
}

impl ResourceHandlers {
    pub fn resource(&self) -> &Resource {
        &self.schema.resources[self.index]
    }

    /// All rows of the resource.
    pub async fn list(&self) -> Result<Vec<Value>, AppError> {
        let resource = self.resource();
        tracing::debug!(resource = %resource.name, "list");
        let mut rows = self
            .store
            .find_many(resource)
            .await
            .map_err(|e| self.read_failed(e))?;
        if self.options.expand_relations {
            self.expand(&mut rows).await;
        }
        Ok(rows)
    }

    /// One row by primary key, or `None` when absent.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Value>, AppError> {
        let resource = self.resource();
        let (pk, id) = coerce_id(&self.schema, resource, id)?;
        tracing::debug!(resource = %resource.name, id = %id, "get");
        let rows = self
            .store
            .find_where(resource, &Predicate::eq(pk.column(), id))
            .await
            .map_err(|e| self.read_failed(e))?;
        let mut rows: Vec<Value> = rows.into_iter().take(1).collect();
        if self.options.expand_relations {
            self.expand(&mut rows).await;
        }
        Ok(rows.pop())
    }

    /// Insert a row from a UI payload and return it as stored.
    pub async fn create(&self, payload: Value) -> Result<Value, AppError> {
        let resource = self.resource();
        let record = for_create(&self.schema, resource, payload)?;
        tracing::debug!(resource = %resource.name, "create");
        self.store
            .insert(resource, &record)
            .await
            .map_err(|reason| AppError::InsertFailed {
                resource: resource.name.clone(),
                reason,
            })
    }

    /// Partial update keyed by primary key. Never inserts.
    pub async fn update(&self, id: &str, payload: Value) -> Result<Value, AppError> {
        let resource = self.resource();
        let (pk, key) = coerce_id(&self.schema, resource, id)?;
        let changes = for_update(&self.schema, resource, payload)?;
        tracing::debug!(resource = %resource.name, id = %key, "update");
        let rows = self
            .store
            .update_where(resource, &Predicate::eq(pk.column(), key), &changes)
            .await
            .map_err(|reason| AppError::UpdateFailed {
                resource: resource.name.clone(),
                reason,
            })?;
        rows.into_iter().next().ok_or_else(|| self.not_found(id))
    }

    /// Remove a row and return it.
    pub async fn delete(&self, id: &str) -> Result<Value, AppError> {
        let resource = self.resource();
        let (pk, key) = coerce_id(&self.schema, resource, id)?;
        tracing::debug!(resource = %resource.name, id = %key, "delete");
        let rows = self
            .store
            .delete_where(resource, &Predicate::eq(pk.column(), key))
            .await
            .map_err(|reason| AppError::DeleteFailed {
                resource: resource.name.clone(),
                reason,
            })?;
        rows.into_iter().next().ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &str) -> AppError {
        AppError::NotFound {
            resource: self.resource().name.clone(),
            id: id.to_string(),
        }
    }

    fn read_failed(&self, source: StoreError) -> AppError {
        AppError::Store {
            resource: self.resource().name.clone(),
            source,
        }
    }

    /// Batch-load each relation's targets and attach them under the expansion key. Failures leave
    /// the bare foreign-key values in place.
    async fn expand(&self, rows: &mut [Value]) {
        let resource = self.resource();
        for field in resource.relations() {
            let Some(related) = field.related_resource.as_deref().and_then(|r| self.schema.resource(r)) else {
                continue;
            };
            let Some(target_pk) = related.primary_key() else {
                continue;
            };
            let column = field.column();
            let mut keys: Vec<Value> = Vec::new();
            for v in rows.iter().filter_map(|r| r.get(column)).filter(|v| !v.is_null()) {
                if !keys.iter().any(|k| value_key(k) == value_key(v)) {
                    keys.push(v.clone());
                }
            }
            if keys.is_empty() {
                continue;
            }
            let found = match self.store.find_in(related, target_pk.column(), &keys).await {
                Ok(found) => found,
                Err(StoreError::Unsupported(op)) => {
                    tracing::debug!(resource = %resource.name, op, "store cannot expand relations");
                    return;
                }
                Err(e) => {
                    tracing::warn!(resource = %resource.name, relation = %field.name, error = %e, "relation expansion failed");
                    continue;
                }
            };
            let by_key: HashMap<String, Value> = found
                .into_iter()
                .filter_map(|r| r.get(target_pk.column()).map(|k| (value_key(k), r.clone())))
                .collect();
            let key = expansion_key(field, related);
            for row in rows.iter_mut() {
                let Some(obj) = row.as_object_mut() else { continue };
                if obj.contains_key(&key) {
                    continue;
                }
                if let Some(target) = obj.get(column).and_then(|v| by_key.get(&value_key(v))) {
                    let target = target.clone();
                    obj.insert(key.clone(), target);
                }
            }
        }
    }
}

/// Key under which an expanded relation is attached: the UI name when it differs from the column,
/// else the column without its id suffix, else the related resource name.
fn expansion_key(field: &Field, related: &Resource) -> String {
    if field.name != field.column() {
        return field.name.clone();
    }
    match strip_id_suffix(field.column()) {
        Some(base) if base != field.column() => base.to_string(),
        _ => related.name.clone(),
    }
}

/// Resource-name-indexed dispatch table of handler sets.
pub struct HandlerMap {
    by_name: HashMap<String, ResourceHandlers>,
}

impl HandlerMap {
    pub fn new(schema: Arc<ResourceSchema>, store: Arc<dyn Store>, options: HandlerOptions) -> Self {
        let by_name = schema
            .resources
            .iter()
            .enumerate()
            .map(|(index, r)| {
                let handlers = ResourceHandlers {
                    schema: schema.clone(),
                    index,
                    store: store.clone(),
                    options: options.clone(),
                };
                (r.name.clone(), handlers)
            })
            .collect();
        tracing::info!(resources = schema.len(), expand = options.expand_relations, "handlers registered");
        HandlerMap { by_name }
    }

    pub fn get(&self, resource: &str) -> Result<&ResourceHandlers, AppError> {
        self.by_name
            .get(resource)
            .ok_or_else(|| AppError::UnknownResource(resource.to_string()))
    }
}
