//! Backend capabilities and their adapters.
//!
//! - `trait`: capability traits every adapter implements, plus the error types
//! - `in_memory`: tenant-isolated maps for tests and local development
//! - `rest`: PostgREST / Supabase-style HTTP API
//! - `postgres`: direct `sqlx` access to the same tables

pub mod in_memory;
pub mod postgres;
pub mod rest;
mod rows;
pub mod r#trait;

pub use in_memory::{InMemoryBackend, RemoteHandler};
pub use postgres::PostgresBackend;
pub use rest::RestBackend;
pub use r#trait::{
    Backend, BackendError, CatalogSource, DiscountDirectory, FeatureFlagStore, QuoteSink,
    RemoteCallError, RemoteFunctions,
};

use std::sync::Arc;

use crate::config::{AppConfig, BackendConfig};

/// Build the backend selected by `config`.
pub async fn connect(config: &AppConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let backend: Arc<dyn Backend> = match &config.backend {
        BackendConfig::Memory => Arc::new(InMemoryBackend::new()),
        BackendConfig::Rest {
            url,
            anon_key,
            service_token,
        } => Arc::new(RestBackend::new(
            url.clone(),
            anon_key.clone(),
            service_token.clone(),
            config.http_timeout,
        )?),
        BackendConfig::Postgres { database_url } => {
            Arc::new(PostgresBackend::connect(database_url).await?)
        }
    };
    tracing::info!(backend = config.backend.name(), "backend ready");
    Ok(backend)
}
