//! Postgres-backed implementation of the backend capabilities.
//!
//! Same tables as the PostgREST adapter, queried directly. Every query is
//! filtered by `tenant_id`.
//!
//! ## Error Mapping
//!
//! | SQLx error | Code | BackendError |
//! |---|---|---|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Database` |
//! | PoolClosed / Io / other | n/a | `Database` |

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tracing::instrument;

use hearth_core::SessionContext;
use hearth_pricing::{DiscountRecord, PriceBookEntry, Sku};
use hearth_quotes::{QuoteId, QuoteSubmitted};
use hearth_tenants::{FlagKey, FlagPatch};

use super::r#trait::{
    BackendError, CatalogSource, DiscountDirectory, FeatureFlagStore, QuoteSink, RemoteCallError,
    RemoteFunctions, check_function_name, reject_error_body,
};
use super::rows::{DiscountRow, PriceBookRow};

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: Arc<PgPool>,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CatalogSource for PostgresBackend {
    #[instrument(skip(self, ctx, only), fields(tenant_id = %ctx.tenant_id()), err)]
    async fn load(
        &self,
        ctx: &SessionContext,
        only: Option<&[Sku]>,
    ) -> Result<Vec<PriceBookEntry>, BackendError> {
        let codes: Option<Vec<String>> =
            only.map(|codes| codes.iter().map(|c| c.as_str().to_string()).collect());

        let rows = sqlx::query(
            r#"
            SELECT code, base_price::text AS base_price, active
            FROM price_book
            WHERE tenant_id = $1
              AND active = TRUE
              AND ($2::text[] IS NULL OR code = ANY($2))
            ORDER BY code
            "#,
        )
        .bind(ctx.tenant_id().as_uuid())
        .bind(codes)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_price_book", e))?;

        rows.into_iter()
            .map(|row| {
                let get_err = |e| map_sqlx_error("load_price_book", e);
                price_row(
                    row.try_get("code").map_err(get_err)?,
                    row.try_get("base_price").map_err(get_err)?,
                    row.try_get("active").map_err(get_err)?,
                )
                .into_entry()
            })
            .collect()
    }
}

#[async_trait]
impl DiscountDirectory for PostgresBackend {
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id()), err)]
    async fn lookup(
        &self,
        ctx: &SessionContext,
        code: &str,
    ) -> Result<Option<DiscountRecord>, BackendError> {
        let code = DiscountRecord::normalize_code(code);
        let row = sqlx::query(
            r#"
            SELECT code, org_name, active, discount_type,
                   amount::text AS amount, percent_bps, tier_amounts
            FROM partner_discounts
            WHERE tenant_id = $1 AND code = $2
            LIMIT 1
            "#,
        )
        .bind(ctx.tenant_id().as_uuid())
        .bind(&code)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("lookup_discount", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let get_err = |e| map_sqlx_error("lookup_discount", e);
        let amount: Option<String> = row.try_get("amount").map_err(get_err)?;
        let percent_bps: Option<i32> = row.try_get("percent_bps").map_err(get_err)?;
        let tier_amounts: Option<JsonValue> = row.try_get("tier_amounts").map_err(get_err)?;

        let record = DiscountRow {
            code: row.try_get("code").map_err(get_err)?,
            org_name: row.try_get("org_name").map_err(get_err)?,
            active: row.try_get("active").map_err(get_err)?,
            discount_type: row.try_get("discount_type").map_err(get_err)?,
            amount: amount.map(JsonValue::String),
            percent_bps: percent_column(percent_bps)?,
            tier_amounts: tier_amounts_column(tier_amounts)?,
        }
        .into_record()?;

        Ok(Some(record))
    }
}

#[async_trait]
impl QuoteSink for PostgresBackend {
    #[instrument(skip(self, ctx, quote), fields(tenant_id = %ctx.tenant_id(), quote_id = %quote.quote_id), err)]
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

        let payload = serde_json::to_value(quote).map_err(|e| BackendError::Decode(e.to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO quotes (
                id, tenant_id, submitted_by, payload,
                subtotal_cents, discount_code, discount_cents, total_cents, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(quote.quote_id.0.as_uuid())
        .bind(quote.tenant_id.as_uuid())
        .bind(quote.submitted_by.map(|u| *u.as_uuid()))
        .bind(payload)
        .bind(quote.subtotal.cents())
        .bind(quote.discount.as_ref().map(|d| d.code.clone()))
        .bind(quote.discount.as_ref().map(|d| d.amount.cents()))
        .bind(quote.total.cents())
        .bind(quote.occurred_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_quote", e))?;

        let id: uuid::Uuid = row.try_get("id").map_err(|e| map_sqlx_error("insert_quote", e))?;
        Ok(QuoteId::new(hearth_core::AggregateId::from_uuid(id)))
    }
}

#[async_trait]
impl FeatureFlagStore for PostgresBackend {
    async fn list(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT key, enabled
            FROM tenant_features
            WHERE tenant_id = $1
            ORDER BY key
            "#,
        )
        .bind(ctx.tenant_id().as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_features", e))?;

        rows.into_iter()
            .map(|row| {
                let key: String = row.try_get("key").map_err(|e| map_sqlx_error("list_features", e))?;
                let enabled: bool = row
                    .try_get("enabled")
                    .map_err(|e| map_sqlx_error("list_features", e))?;
                let key = FlagKey::new(&key).map_err(|e| BackendError::Decode(e.to_string()))?;
                Ok((key, enabled))
            })
            .collect()
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id(), key = %patch.key), err)]
    async fn write(&self, ctx: &SessionContext, patch: &FlagPatch) -> Result<(), BackendError> {
        let tenant = *ctx.tenant_id().as_uuid();
        let query = match patch.enabled {
            Some(enabled) => sqlx::query(
                r#"
                INSERT INTO tenant_features (tenant_id, key, enabled)
                VALUES ($1, $2, $3)
                ON CONFLICT (tenant_id, key)
                DO UPDATE SET enabled = EXCLUDED.enabled, updated_at = NOW()
                "#,
            )
            .bind(tenant)
            .bind(patch.key.as_str())
            .bind(enabled),
            None => sqlx::query("DELETE FROM tenant_features WHERE tenant_id = $1 AND key = $2")
                .bind(tenant)
                .bind(patch.key.as_str()),
        };

        query
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("write_feature", e))?;
        Ok(())
    }
}

#[async_trait]
impl RemoteFunctions for PostgresBackend {
    /// Edge functions live outside the database.
    async fn invoke(
        &self,
        _ctx: &SessionContext,
        name: &str,
        _body: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        check_function_name(name)?;
        Err(RemoteCallError::Unsupported(name.to_string()))
    }

    /// Calls `<name>(tenant uuid, args jsonb) RETURNS jsonb`.
    async fn rpc(
        &self,
        ctx: &SessionContext,
        name: &str,
        args: JsonValue,
    ) -> Result<JsonValue, RemoteCallError> {
        check_function_name(name)?;
        if name.contains('-') {
            return Err(RemoteCallError::InvalidName(name.to_string()));
        }

        let sql = format!("SELECT {name}($1, $2) AS result");
        let row = sqlx::query(&sql)
            .bind(ctx.tenant_id().as_uuid())
            .bind(args)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| RemoteCallError::Transport {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let result: JsonValue = row.try_get("result").map_err(|e| RemoteCallError::Transport {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        reject_error_body(name, result)
    }
}

/// Numeric columns are selected as `::text` so they decode like PostgREST strings.
fn price_row(code: String, base_price: String, active: bool) -> PriceBookRow {
    PriceBookRow {
        code,
        base_price: JsonValue::String(base_price),
        active,
    }
}

fn percent_column(value: Option<i32>) -> Result<Option<u32>, BackendError> {
    value
        .map(u32::try_from)
        .transpose()
        .map_err(|e| BackendError::Decode(format!("percent_bps: {e}")))
}

fn tier_amounts_column(
    value: Option<JsonValue>,
) -> Result<Option<BTreeMap<String, JsonValue>>, BackendError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| BackendError::Decode(format!("tier_amounts: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => BackendError::Conflict(msg),
                _ => BackendError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            BackendError::Database(format!("connection pool closed in {}", operation))
        }
        _ => BackendError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}
