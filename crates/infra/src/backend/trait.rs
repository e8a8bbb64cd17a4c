use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use hearth_core::SessionContext;
use hearth_pricing::{DiscountRecord, PriceBookEntry, Sku};
use hearth_quotes::{QuoteId, QuoteSubmitted};
use hearth_tenants::{FlagKey, FlagPatch};

/// Backend operation error.
///
/// Infrastructure failures only (transport, storage, decoding). Business
/// outcomes such as an unknown discount code are values, not errors.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error(transparent)]
    Remote(#[from] RemoteCallError),
}

/// Failure of an opaque named remote procedure / edge function.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteCallError {
    #[error("invalid remote function name `{0}`")]
    InvalidName(String),

    #[error("remote function `{0}` is not available on this backend")]
    Unsupported(String),

    #[error("call to `{name}` failed: {message}")]
    Transport { name: String, message: String },

    /// Non-2xx status.
    #[error("`{name}` returned HTTP {status}: {message}")]
    Status {
        name: String,
        status: u16,
        message: String,
    },

    /// 2xx with an `{ "error": ... }` body.
    #[error("`{name}` reported an error: {message}")]
    Rejected { name: String, message: String },
}

/// Price book reads.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Active rows only. With `only`, restricted to those codes.
    async fn load(
        &self,
        ctx: &SessionContext,
        only: Option<&[Sku]>,
    ) -> Result<Vec<PriceBookEntry>, BackendError>;
}

/// Partner discount lookups.
#[async_trait]
pub trait DiscountDirectory: Send + Sync {
    /// Exact match on the normalized code. Inactive records are returned
    /// as-is; gating happens in pricing.
    async fn lookup(
        &self,
        ctx: &SessionContext,
        code: &str,
    ) -> Result<Option<DiscountRecord>, BackendError>;
}

/// Quote creation boundary.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    async fn submit(
        &self,
        ctx: &SessionContext,
        quote: &QuoteSubmitted,
    ) -> Result<QuoteId, BackendError>;
}

/// Tenant feature flag persistence.
#[async_trait]
pub trait FeatureFlagStore: Send + Sync {
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError>;

    async fn write(&self, ctx: &SessionContext, patch: &FlagPatch) -> Result<(), BackendError>;
}

/// Opaque server-side procedures invoked by name with JSON in/out.
#[async_trait]
pub trait RemoteFunctions: Send + Sync {
    /// Edge function (`/functions/v1/<name>`).
    async fn invoke(
        &self,
        ctx: &SessionContext,
        name: &str,
        body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError>;

    /// Database procedure (`rpc/<name>`).
    async fn rpc(
        &self,
        ctx: &SessionContext,
        name: &str,
        args: JsonValue,
    ) -> Result<JsonValue, RemoteCallError>;
}

/// Everything the application needs from one backend.
pub trait Backend:
    CatalogSource + DiscountDirectory + QuoteSink + FeatureFlagStore + RemoteFunctions
{
}

impl<T> Backend for T where
    T: CatalogSource + DiscountDirectory + QuoteSink + FeatureFlagStore + RemoteFunctions
{
}

#[async_trait]
impl<S> CatalogSource for Arc<S>
where
    S: CatalogSource + ?Sized,
{
    async fn load(
        &self,
        ctx: &SessionContext,
        only: Option<&[Sku]>,
    ) -> Result<Vec<PriceBookEntry>, BackendError> {
        (**self).load(ctx, only).await
    }
}

#[async_trait]
impl<S> DiscountDirectory for Arc<S>
where
    S: DiscountDirectory + ?Sized,
{
    async fn lookup(
        &self,
        ctx: &SessionContext,
        code: &str,
    ) -> Result<Option<DiscountRecord>, BackendError> {
        (**self).lookup(ctx, code).await
    }
}

#[async_trait]
impl<S> QuoteSink for Arc<S>
where
    S: QuoteSink + ?Sized,
{
    async fn submit(
        &self,
        ctx: &SessionContext,
        quote: &QuoteSubmitted,
    ) -> Result<QuoteId, BackendError> {
        (**self).submit(ctx, quote).await
    }
}

#[async_trait]
impl<S> FeatureFlagStore for Arc<S>
where
    S: FeatureFlagStore + ?Sized,
{
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError> {
        (**self).list(ctx).await
    }

    async fn write(&self, ctx: &SessionContext, patch: &FlagPatch) -> Result<(), BackendError> {
        (**self).write(ctx, patch).await
    }
}

/// Remote function names are interpolated into URLs and SQL.
pub(crate) fn check_function_name(name: &str) -> Result<(), RemoteCallError> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        && name.len() <= 63;
    if valid {
        Ok(())
    } else {
        Err(RemoteCallError::InvalidName(name.to_string()))
    }
}

/// Treat `{ "error": ... }` bodies as failures even on 2xx.
pub(crate) fn reject_error_body(name: &str, body: JsonValue) -> Result<JsonValue, RemoteCallError> {
    match body.get("error") {
        Some(err) if !err.is_null() => {
            let message = match err {
                JsonValue::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            };
            Err(RemoteCallError::Rejected {
                name: name.to_string(),
                message,
            })
        }
        _ => Ok(body),
    }
}
