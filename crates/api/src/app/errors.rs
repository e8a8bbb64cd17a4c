use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use hearth_core::DomainError;
use hearth_infra::{BackendError, EstimateError, RemoteCallError, SubmitError, ToggleError};
use hearth_pricing::PricingError;
use hearth_quotes::WizardError;
use hearth_tenants::FlagError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Every pricing failure is shown as "pricing unavailable, please call".
pub fn pricing_error_to_response(err: PricingError) -> axum::response::Response {
    match &err {
        PricingError::Unavailable { missing } => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({
                "error": "pricing_unavailable",
                "message": err.to_string(),
                "missing": missing,
            })),
        )
            .into_response(),
        PricingError::Catalog(_) | PricingError::DuplicateSku(_) | PricingError::InvalidSku(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "catalog_unavailable", err.to_string())
        }
        PricingError::Overflow => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "estimate_overflow", err.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn backend_error_to_response(err: BackendError) -> axum::response::Response {
    match err {
        BackendError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        BackendError::TenantIsolation(msg) => {
            json_error(StatusCode::FORBIDDEN, "tenant_isolation", msg)
        }
        BackendError::Remote(e) => remote_error_to_response(e),
        other => json_error(StatusCode::BAD_GATEWAY, "backend_error", other.to_string()),
    }
}

pub fn remote_error_to_response(err: RemoteCallError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        RemoteCallError::InvalidName(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_function_name", message)
        }
        RemoteCallError::Unsupported(_) => {
            json_error(StatusCode::NOT_IMPLEMENTED, "unsupported", message)
        }
        RemoteCallError::Rejected { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "remote_rejected", message)
        }
        RemoteCallError::Status { status: 404, .. } => {
            json_error(StatusCode::NOT_FOUND, "not_found", message)
        }
        RemoteCallError::Transport { .. } | RemoteCallError::Status { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "remote_error", message)
        }
    }
}

pub fn estimate_error_to_response(err: EstimateError) -> axum::response::Response {
    match err {
        EstimateError::Pricing(e) => pricing_error_to_response(e),
        EstimateError::Backend(e) => backend_error_to_response(e),
    }
}

pub fn wizard_error_to_response(err: WizardError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        WizardError::Invalid { step, errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "validation_error",
                "message": message,
                "step": step,
                "fields": errors,
            })),
        )
            .into_response(),
        WizardError::PricingUnavailable(e) => pricing_error_to_response(e),
        WizardError::AtFirstStep | WizardError::Finished => {
            json_error(StatusCode::CONFLICT, "invalid_step", message)
        }
    }
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::Rejected(e) => domain_error_to_response(e),
        SubmitError::Pricing(e) => pricing_error_to_response(e),
        SubmitError::Wizard(e) => wizard_error_to_response(e),
        SubmitError::Backend(e) => backend_error_to_response(e),
        e @ (SubmitError::NotReady(_) | SubmitError::InFlight | SubmitError::AlreadySubmitted(_)) => {
            json_error(StatusCode::CONFLICT, "conflict", e.to_string())
        }
    }
}

pub fn toggle_error_to_response(err: ToggleError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ToggleError::Flag(FlagError::InvalidKey(_)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_flag_key", message)
        }
        ToggleError::Flag(FlagError::TenantMismatch) => {
            json_error(StatusCode::FORBIDDEN, "tenant_isolation", message)
        }
        ToggleError::Flag(FlagError::InFlight(_) | FlagError::UnknownToggle(_)) => {
            json_error(StatusCode::CONFLICT, "flag_in_flight", message)
        }
        ToggleError::RolledBack(_) => {
            json_error(StatusCode::BAD_GATEWAY, "flag_write_failed", message)
        }
    }
}
