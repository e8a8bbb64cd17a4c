use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use hearth_infra::price_selection;

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

/// Price a selection against the tenant's current catalog. Nothing is stored.
pub async fn create_estimate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::EstimateRequest>,
) -> axum::response::Response {
    match price_selection(
        services.backend(),
        tenant.session(),
        &body.selection,
        body.discount_code.as_deref(),
    )
    .await
    {
        Ok(priced) => (StatusCode::OK, Json(dto::EstimateResponse::from(priced))).into_response(),
        Err(e) => errors::estimate_error_to_response(e),
    }
}
