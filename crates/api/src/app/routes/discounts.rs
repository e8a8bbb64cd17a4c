use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use hearth_infra::estimator::resolve_discount;

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

/// Check a partner code. Unknown and inactive codes are a 200 with an
/// `invalid` outcome, not an error.
pub async fn lookup_discount(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match resolve_discount(services.backend(), tenant.session(), Some(&code)).await {
        Ok(outcome) => (StatusCode::OK, Json(dto::DiscountView::from(outcome))).into_response(),
        Err(e) => errors::backend_error_to_response(e),
    }
}
