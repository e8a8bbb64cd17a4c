use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use hearth_core::{SessionContext, TenantId, UserId};

use crate::app::errors::json_error;
use crate::context::TenantContext;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Resolve the tenant (and optional user) for the request from headers.
///
/// Authentication happens upstream; this layer only scopes the request.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let session = session_from_headers(req.headers())?;
    req.extensions_mut().insert(TenantContext::new(session));
    Ok(next.run(req).await)
}

fn session_from_headers(headers: &HeaderMap) -> Result<SessionContext, Response> {
    let tenant_id: TenantId = header_value(headers, TENANT_HEADER)?
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "missing_tenant",
                format!("{TENANT_HEADER} header is required"),
            )
        })?
        .parse()
        .map_err(|_| {
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_tenant",
                format!("{TENANT_HEADER} must be a UUID"),
            )
        })?;

    match header_value(headers, USER_HEADER)? {
        None => Ok(SessionContext::anonymous(tenant_id)),
        Some(raw) => {
            let user_id: UserId = raw.parse().map_err(|_| {
                json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_user",
                    format!("{USER_HEADER} must be a UUID"),
                )
            })?;
            Ok(SessionContext::for_user(tenant_id, user_id))
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, Response> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_header",
            format!("{name} is not valid ASCII"),
        )
    })?;
    let value = value.trim();
    Ok((!value.is_empty()).then_some(value))
}
