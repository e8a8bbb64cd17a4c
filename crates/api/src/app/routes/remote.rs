//! Pass-through to named server-side procedures.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value as JsonValue;
use tracing::warn;

use hearth_infra::{RemoteCallError, backend::RemoteFunctions};

use crate::app::{errors, services::AppServices};
use crate::context::TenantContext;

pub async fn call_rpc(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(name): Path<String>,
    Json(args): Json<JsonValue>,
) -> axum::response::Response {
    if let Some(denied) = not_allowed(&services, &tenant, &name) {
        return denied;
    }
    respond(services.backend().rpc(tenant.session(), &name, args).await)
}

pub async fn invoke_function(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(name): Path<String>,
    Json(body): Json<JsonValue>,
) -> axum::response::Response {
    if let Some(denied) = not_allowed(&services, &tenant, &name) {
        return denied;
    }
    respond(services.backend().invoke(tenant.session(), &name, body).await)
}

fn not_allowed(
    services: &AppServices,
    tenant: &TenantContext,
    name: &str,
) -> Option<axum::response::Response> {
    if services.remote_allowed(name) {
        return None;
    }
    warn!(tenant_id = %tenant.session().tenant_id(), function = name, "remote call to unlisted function refused");
    Some(errors::json_error(
        StatusCode::FORBIDDEN,
        "function_not_allowed",
        format!("remote function {name} is not enabled"),
    ))
}

fn respond(result: Result<JsonValue, RemoteCallError>) -> axum::response::Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => errors::remote_error_to_response(e),
    }
}
