use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use hearth_infra::submit_repriced;

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

/// Submit a quote request. The estimate is recomputed here from the
/// tenant's catalog; client-side totals are never trusted.
pub async fn submit_quote(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::SubmitQuoteRequest>,
) -> axum::response::Response {
    match submit_repriced(
        services.backend(),
        tenant.session(),
        &body.contact,
        &body.selection,
        body.discount_code.as_deref(),
    )
    .await
    {
        Ok((id, estimate)) => (
            StatusCode::CREATED,
            Json(dto::SubmitQuoteResponse {
                id,
                total: estimate.total,
                estimate,
            }),
        )
            .into_response(),
        Err(e) => errors::submit_error_to_response(e),
    }
}
