use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::TenantContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(tenant): Extension<TenantContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "tenant_id": tenant.tenant_id().to_string(),
        "user_id": tenant.session().user_id().map(|u| u.to_string()),
    }))
}
