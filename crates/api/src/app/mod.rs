//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend and feature-flag wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    // Tenant-scoped routes: every request carries a tenant header.
    let scoped = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::tenant_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
        .layer(ServiceBuilder::new())
}
