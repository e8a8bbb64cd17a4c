//! PostgREST / Supabase-style HTTP backend.
//!
//! Table reads and writes go through `/rest/v1/<table>`, database procedures
//! through `/rest/v1/rpc/<name>` and edge functions through
//! `/functions/v1/<name>`. Every request carries the project `apikey`, a
//! bearer token (the service token when configured, otherwise the anon key)
//! and the `x-tenant-id` of the calling session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, instrument, warn};

use hearth_core::SessionContext;
use hearth_pricing::{DiscountRecord, PriceBookEntry, Sku};
use hearth_quotes::{QuoteId, QuoteSubmitted};
use hearth_tenants::{FlagKey, FlagPatch};

use super::r#trait::{
    BackendError, CatalogSource, DiscountDirectory, FeatureFlagStore, QuoteSink, RemoteCallError,
    RemoteFunctions, check_function_name, reject_error_body,
};
use super::rows::{DiscountRow, FeatureRow, PriceBookRow};

#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    service_token: Option<String>,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, ctx: &SessionContext, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.service_token.as_deref().unwrap_or(&self.anon_key);
        let request = request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("x-tenant-id", ctx.tenant_id().to_string());
        match ctx.user_id() {
            Some(user) => request.header("x-user-id", user.to_string()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "backend request failed");
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn call(
        &self,
        ctx: &SessionContext,
        path: String,
        name: &str,
        body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        check_function_name(name)?;

        let response = self
            .authorize(ctx, self.client.post(self.url(&path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteCallError::Transport {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        let parsed: JsonValue = if text.trim().is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_str(&text).unwrap_or(JsonValue::String(text.clone()))
        };

        if !status.is_success() {
            let message = parsed
                .get("error")
                .or_else(|| parsed.get("message"))
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .unwrap_or(text);
            return Err(RemoteCallError::Status {
                name: name.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        reject_error_body(name, parsed)
    }
}

/// `in.(A,B)` filter value. Sku codes are restricted to `[A-Z0-9_-]`.
fn in_filter(codes: &[Sku]) -> String {
    let joined = codes.iter().map(Sku::as_str).collect::<Vec<_>>().join(",");
    format!("in.({joined})")
}

#[async_trait]
impl CatalogSource for RestBackend {
    #[instrument(skip(self, ctx, only), fields(tenant_id = %ctx.tenant_id()), err)]
    async fn load(
        &self,
        ctx: &SessionContext,
        only: Option<&[Sku]>,
    ) -> Result<Vec<PriceBookEntry>, BackendError> {
        let mut query = vec![
            ("select", "code,base_price,active".to_string()),
            ("tenant_id", format!("eq.{}", ctx.tenant_id())),
            ("active", "eq.true".to_string()),
        ];
        if let Some(codes) = only {
            query.push(("code", in_filter(codes)));
        }

        let request = self
            .authorize(ctx, self.client.get(self.url("/rest/v1/price_book")))
            .query(&query);
        let rows: Vec<PriceBookRow> = Self::json(self.send(request).await?).await?;
        debug!(rows = rows.len(), "price book loaded");

        rows.into_iter()
            .map(PriceBookRow::into_entry)
            .filter(|entry| entry.as_ref().map_or(true, |e| e.active))
            .collect()
    }
}

#[async_trait]
impl DiscountDirectory for RestBackend {
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()), err)]
    async fn lookup(
        &self,
        ctx: &SessionContext,
        code: &str,
    ) -> Result<Option<DiscountRecord>, BackendError> {
        let code = DiscountRecord::normalize_code(code);
        let request = self
            .authorize(ctx, self.client.get(self.url("/rest/v1/partner_discounts")))
            .query(&[
                ("select", "*".to_string()),
                ("tenant_id", format!("eq.{}", ctx.tenant_id())),
                ("code", format!("eq.{code}")),
                ("limit", "1".to_string()),
            ]);
        let rows: Vec<DiscountRow> = Self::json(self.send(request).await?).await?;

        rows.into_iter().next().map(DiscountRow::into_record).transpose()
    }
}

#[async_trait]
impl QuoteSink for RestBackend {
    #[instrument(skip(self, ctx, quote), fields(tenant_id = %ctx.tenant_id(), quote_id = %quote.quote_id), err)]
    async fn submit(
        &self,
        ctx: &SessionContext,
        quote: &QuoteSubmitted,
    ) -> Result<QuoteId, BackendError> {
        let body = json!({
            "id": quote.quote_id,
            "tenant_id": quote.tenant_id,
            "submitted_by": quote.submitted_by,
            "contact": quote.contact,
            "selection": quote.selection,
            "line_items": quote.line_items,
            "subtotal_cents": quote.subtotal.cents(),
            "discount_code": quote.discount.as_ref().map(|d| d.code.clone()),
            "discount_org": quote.discount.as_ref().map(|d| d.org_name.clone()),
            "discount_cents": quote.discount.as_ref().map(|d| d.amount.cents()),
            "total_cents": quote.total.cents(),
            "submitted_at": quote.occurred_at,
        });

        let request = self
            .authorize(ctx, self.client.post(self.url("/rest/v1/quotes")))
            .header("Prefer", "return=representation")
            .json(&body);
        let rows: Vec<JsonValue> = Self::json(self.send(request).await?).await?;

        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .cloned()
            .ok_or_else(|| BackendError::Decode("quote insert returned no id".to_string()))?;
        serde_json::from_value(id).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FeatureFlagStore for RestBackend {
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError> {
        let request = self
            .authorize(ctx, self.client.get(self.url("/rest/v1/tenant_features")))
            .query(&[
                ("select", "key,enabled".to_string()),
                ("tenant_id", format!("eq.{}", ctx.tenant_id())),
            ]);
        let rows: Vec<FeatureRow> = Self::json(self.send(request).await?).await?;

        rows.into_iter()
            .map(|row| {
                FlagKey::new(&row.key)
                    .map(|key| (key, row.enabled))
                    .map_err(|e| BackendError::Decode(e.to_string()))
            })
            .collect()
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id(), key = %patch.key), err)]
    async fn write(&self, ctx: &SessionContext, patch: &FlagPatch) -> Result<(), BackendError> {
        let filter = [
            ("tenant_id", format!("eq.{}", ctx.tenant_id())),
            ("key", format!("eq.{}", patch.key)),
        ];
        let request = match patch.enabled {
            Some(enabled) => self
                .authorize(ctx, self.client.post(self.url("/rest/v1/tenant_features")))
                .header("Prefer", "resolution=merge-duplicates")
                .json(&json!({
                    "tenant_id": ctx.tenant_id(),
                    "key": patch.key,
                    "enabled": enabled,
                })),
            None => self
                .authorize(ctx, self.client.delete(self.url("/rest/v1/tenant_features")))
                .query(&filter),
        };
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFunctions for RestBackend {
    async fn invoke(
        &self,
        ctx: &SessionContext,
        name: &str,
        body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        self.call(ctx, format!("/functions/v1/{name}"), name, body).await
    }

    async fn rpc(
        &self,
        ctx: &SessionContext,
        name: &str,
        args: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        self.call(ctx, format!("/rest/v1/rpc/{name}"), name, args).await
    }
}
