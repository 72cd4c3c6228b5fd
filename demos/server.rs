//! Example server: introspects a PostgreSQL schema (or loads an explicit resource config), then
//! mounts the admin API over a `PgStore`.

use admingen::{
    admin_routes, build_schema, introspect::postgres::{load_column_types, load_source}, load_from_path, store::postgres::pg_schema,
    AppState, HandlerOptions, PgStore, SchemaSource,
};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("admingen=info".parse()?))
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/admingen".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let schema_name = pg_schema();
    let config = match std::env::var("ADMINGEN_CONFIG") {
        Ok(path) => Some(load_from_path(&path).await?),
        Err(_) => None,
    };
    let source = match &config {
        Some(_) => SchemaSource::default(),
        None => load_source(&pool, &schema_name).await?,
    };
    let mut schema = build_schema(&source, config.as_ref())?;
    if config.is_some() {
        schema.fill_storage_types(&load_column_types(&pool, &schema_name).await?);
    }
    tracing::info!(schema = %schema_name, resources = schema.len(), "admin schema ready");

    let options = HandlerOptions {
        expand_relations: std::env::var("ADMINGEN_EXPAND_RELATIONS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    };
    let store = Arc::new(PgStore::new(pool, schema_name));
    let state = AppState::new(schema, store, options);

    let prefix = std::env::var("ADMINGEN_PATH").unwrap_or_else(|_| "/admin/api".into());
    let app = Router::new().nest(&prefix, admin_routes(state));

    let bind = std::env::var("ADMINGEN_BIND").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
