use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use hearth_tenants::FlagKey;

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

pub async fn list_flags(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.flags().refresh(tenant.session()).await {
        Ok(flags) => (StatusCode::OK, Json(dto::flags_to_json(flags))).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}

pub async fn toggle_flag(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(key): Path<String>,
    Json(body): Json<dto::ToggleFlagRequest>,
) -> axum::response::Response {
    let key = match FlagKey::new(&key) {
        Ok(k) => k,
        Err(e) => return errors::toggle_error_to_response(e.into()),
    };

    match services
        .flags()
        .toggle(tenant.session(), key.clone(), body.enabled)
        .await
    {
        Ok(enabled) => (StatusCode::OK, Json(dto::FlagView { key, enabled })).into_response(),
        Err(e) => errors::toggle_error_to_response(e),
    }
}
