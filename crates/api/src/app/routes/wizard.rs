use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use hearth_infra::estimator::load_catalog;
use hearth_quotes::{Channel, EstimateSession, WizardForm, WizardStep};

use crate::app::{dto, errors, services::AppServices};
use crate::context::TenantContext;

/// Server-side check of one wizard step, for clients that keep the form
/// state themselves.
pub async fn validate_step(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(step): Path<WizardStep>,
    Json(form): Json<WizardForm>,
) -> axum::response::Response {
    let mut session = EstimateSession::new();

    // Priced steps need the SKUs of the current selection.
    if step != WizardStep::Contact {
        if let Some(selection) = &form.selection {
            let required = selection.required_skus();
            let token = session.begin(Channel::Catalog);
            let catalog = load_catalog(services.backend(), tenant.session(), Some(&required)).await;
            session.complete_catalog(token, catalog);
        }
    }

    match hearth_quotes::validate_step(step, &form, &session) {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::StepValidated {
                step,
                next: step.next(),
            }),
        )
            .into_response(),
        Err(e) => errors::wizard_error_to_response(e),
    }
}
