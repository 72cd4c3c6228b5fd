//! Shared application state for all routes. The schema is fixed at startup.

use crate::config::ResourceSchema;
use crate::service::{HandlerMap, HandlerOptions};
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub schema: Arc<ResourceSchema>,
    pub handlers: Arc<HandlerMap>,
}

impl AppState {
    pub fn new(schema: ResourceSchema, store: Arc<dyn Store>, options: HandlerOptions) -> Self {
        let schema = Arc::new(schema);
        let handlers = HandlerMap::new(schema.clone(), store, options);
        AppState {
            schema,
            handlers: Arc::new(handlers),
        }
    }
}
