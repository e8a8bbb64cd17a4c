use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use hearth_core::{SessionContext, TenantId};
use hearth_pricing::{DiscountRecord, PriceBookEntry, Sku};
use hearth_quotes::{QuoteId, QuoteSubmitted};
use hearth_tenants::{FlagKey, FlagPatch};

use super::r#trait::{
    BackendError, CatalogSource, DiscountDirectory, FeatureFlagStore, QuoteSink, RemoteCallError,
    RemoteFunctions, check_function_name, reject_error_body,
};
use crate::read_model::{InMemoryTenantStore, TenantStore};

/// Handler standing in for a server-side function in dev/tests.
pub type RemoteHandler =
    Arc<dyn Fn(&SessionContext, JsonValue) -> Result<JsonValue, String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RemoteKind {
    Edge,
    Rpc,
}

/// Tenant-isolated backend for tests and local development.
#[derive(Default)]
pub struct InMemoryBackend {
    prices: InMemoryTenantStore<Sku, PriceBookEntry>,
    discounts: InMemoryTenantStore<String, DiscountRecord>,
    quotes: InMemoryTenantStore<QuoteId, QuoteSubmitted>,
    flags: InMemoryTenantStore<FlagKey, bool>,
    remote: RwLock<HashMap<(RemoteKind, String), RemoteHandler>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace price book rows (inactive rows included).
    pub fn seed_prices<I>(&self, tenant_id: TenantId, entries: I)
    where
        I: IntoIterator<Item = PriceBookEntry>,
    {
        for entry in entries {
            self.prices.upsert(tenant_id, entry.code.clone(), entry);
        }
    }

    pub fn seed_discount(&self, tenant_id: TenantId, record: DiscountRecord) {
        let code = DiscountRecord::normalize_code(&record.code);
        self.discounts.upsert(tenant_id, code, record);
    }

    pub fn seed_flag(&self, tenant_id: TenantId, key: FlagKey, enabled: bool) {
        self.flags.upsert(tenant_id, key, enabled);
    }

    pub fn register_edge_function(&self, name: &str, handler: RemoteHandler) {
        self.register(RemoteKind::Edge, name, handler);
    }

    pub fn register_rpc(&self, name: &str, handler: RemoteHandler) {
        self.register(RemoteKind::Rpc, name, handler);
    }

    fn register(&self, kind: RemoteKind, name: &str, handler: RemoteHandler) {
        self.remote
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert((kind, name.to_string()), handler);
    }

    /// Quotes submitted by one tenant, in id (submission time) order.
    pub fn quotes(&self, tenant_id: TenantId) -> Vec<QuoteSubmitted> {
        self.quotes
            .entries(tenant_id)
            .into_iter()
            .map(|(_, q)| q)
            .collect()
    }

    fn call(
        &self,
        kind: RemoteKind,
        ctx: &SessionContext,
        name: &str,
        body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        check_function_name(name)?;
        let handler = self
            .remote
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| RemoteCallError::Status {
                name: name.to_string(),
                status: 404,
                message: "function not found".to_string(),
            })?;

        let out = handler(ctx, body).map_err(|message| RemoteCallError::Status {
            name: name.to_string(),
            status: 500,
            message,
        })?;
        reject_error_body(name, out)
    }
}

#[async_trait]
impl CatalogSource for InMemoryBackend {
    async fn load(
        &self,
        ctx: &SessionContext,
        only: Option<&[Sku]>,
    ) -> Result<Vec<PriceBookEntry>, BackendError> {
        Ok(self
            .prices
            .entries(ctx.tenant_id())
            .into_iter()
            .map(|(_, entry)| entry)
            .filter(|entry| entry.active)
            .filter(|entry| only.is_none_or(|codes| codes.contains(&entry.code)))
            .collect())
    }
}

#[async_trait]
impl DiscountDirectory for InMemoryBackend {
    async fn lookup(
        &self,
        ctx: &SessionContext,
        code: &str,
    ) -> Result<Option<DiscountRecord>, BackendError> {
        Ok(self
            .discounts
            .get(ctx.tenant_id(), &DiscountRecord::normalize_code(code)))
    }
}

#[async_trait]
impl QuoteSink for InMemoryBackend {
    async fn submit(
        &self,
        ctx: &SessionContext,
        quote: &QuoteSubmitted,
    ) -> Result<QuoteId, BackendError> {
        if quote.tenant_id != ctx.tenant_id() {
            return Err(BackendError::TenantIsolation(format!(
                "quote for tenant {} submitted in session of tenant {}",
                quote.tenant_id,
                ctx.tenant_id()
            )));
        }
        if self.quotes.get(ctx.tenant_id(), &quote.quote_id).is_some() {
            return Err(BackendError::Conflict(format!(
                "quote {} already exists",
                quote.quote_id
            )));
        }
        self.quotes
            .upsert(ctx.tenant_id(), quote.quote_id, quote.clone());
        Ok(quote.quote_id)
    }
}

#[async_trait]
impl FeatureFlagStore for InMemoryBackend {
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError> {
        Ok(self.flags.entries(ctx.tenant_id()))
    }

    async fn write(&self, ctx: &SessionContext, patch: &FlagPatch) -> Result<(), BackendError> {
        match patch.enabled {
            Some(enabled) => self.flags.upsert(ctx.tenant_id(), patch.key.clone(), enabled),
            None => {
                self.flags.remove(ctx.tenant_id(), &patch.key);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteFunctions for InMemoryBackend {
    async fn invoke(
        &self,
        ctx: &SessionContext,
        name: &str,
        body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        self.call(RemoteKind::Edge, ctx, name, body)
    }

    async fn rpc(
        &self,
        ctx: &SessionContext,
        name: &str,
        args: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        self.call(RemoteKind::Rpc, ctx, name, args)
    }
}
