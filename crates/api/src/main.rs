use std::sync::Arc;

use anyhow::Context;

use hearth_api::app::{build_app, services::AppServices};
use hearth_infra::{AppConfig, backend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    hearth_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let backend = backend::connect(&config)
        .await
        .context("failed to initialise backend")?;

    let services = AppServices::new(backend).with_remote_functions(config.remote_functions.iter().cloned());
    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        backend = config.backend.name(),
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
