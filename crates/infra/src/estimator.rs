//! Catalog loading, discount resolution and one-shot pricing against a
//! backend.

use thiserror::Error;
use tracing::{debug, warn};

use hearth_core::SessionContext;
use hearth_pricing::{
    DiscountOutcome, EstimateResult, PriceCatalog, PricingError, Selection, Sku, estimate,
};

use crate::backend::{BackendError, CatalogSource, DiscountDirectory};

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Estimate plus the discount outcome shown next to the code field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedEstimate {
    pub estimate: EstimateResult,
    pub discount: DiscountOutcome,
}

/// Load a catalog snapshot. Any backend failure is pricing-unavailable.
pub async fn load_catalog<C>(
    source: &C,
    ctx: &SessionContext,
    only: Option<&[Sku]>,
) -> Result<PriceCatalog, PricingError>
where
    C: CatalogSource + ?Sized,
{
    let rows = source.load(ctx, only).await.map_err(|e| {
        warn!(tenant_id = %ctx.tenant_id(), error = %e, "price catalog load failed");
        PricingError::catalog(e.to_string())
    })?;
    let catalog = PriceCatalog::from_entries(rows)?;
    debug!(tenant_id = %ctx.tenant_id(), skus = catalog.len(), "price catalog loaded");
    Ok(catalog)
}

/// Look up `code`. A blank or absent code never touches the backend.
pub async fn resolve_discount<D>(
    directory: &D,
    ctx: &SessionContext,
    code: Option<&str>,
) -> Result<DiscountOutcome, BackendError>
where
    D: DiscountDirectory + ?Sized,
{
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(DiscountOutcome::NoCode);
    };
    let record = directory.lookup(ctx, code).await?;
    Ok(DiscountOutcome::resolve(Some(code), record))
}

/// Price `selection` with only the SKUs it needs loaded.
pub async fn price_selection<B>(
    backend: &B,
    ctx: &SessionContext,
    selection: &Selection,
    discount_code: Option<&str>,
) -> Result<PricedEstimate, EstimateError>
where
    B: CatalogSource + DiscountDirectory + ?Sized,
{
    let required = selection.required_skus();
    let catalog = load_catalog(backend, ctx, Some(&required)).await?;
    let discount = resolve_discount(backend, ctx, discount_code).await?;

    let estimate = estimate(selection, &catalog, discount.record()).inspect_err(|e| {
        warn!(tenant_id = %ctx.tenant_id(), error = %e, "pricing unavailable");
    })?;

    Ok(PricedEstimate { estimate, discount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use hearth_core::{Money, TenantId};
    use hearth_pricing::{
        DiscountKind, DiscountRecord, DryerVentOptions, InvalidReason, PackageTier,
        PriceBookEntry,
    };

    fn sku(s: &str) -> Sku {
        Sku::new(s).unwrap()
    }

    fn seeded() -> (InMemoryBackend, SessionContext) {
        let backend = InMemoryBackend::new();
        let ctx = SessionContext::anonymous(TenantId::new());
        backend.seed_prices(
            ctx.tenant_id(),
            [
                PriceBookEntry::active(sku("PKG-COMP"), Money::from_units(200)),
                PriceBookEntry::active(sku("ACC-ROOF"), Money::from_units(50)),
                PriceBookEntry::active(sku("DV-TRANS-HD"), Money::from_units(30)),
                PriceBookEntry::active(sku("EXT-GUARD-STD"), Money::from_units(20)),
            ],
        );
        backend.seed_discount(
            ctx.tenant_id(),
            DiscountRecord {
                code: "MAPLE25".into(),
                org_name: "Maple Realty".into(),
                active: true,
                kind: DiscountKind::Flat {
                    amount: Money::from_units(25),
                },
            },
        );
        (backend, ctx)
    }

    fn better_with_roof() -> Selection {
        let mut o = DryerVentOptions::new(PackageTier::Better);
        o.roof_access = true;
        Selection::DryerVent(o)
    }

    #[tokio::test]
    async fn prices_selection_end_to_end() {
        let (backend, ctx) = seeded();
        let priced = price_selection(&backend, &ctx, &better_with_roof(), None)
            .await
            .unwrap();
        assert_eq!(priced.estimate.total, Money::from_units(250));
        assert_eq!(priced.discount, DiscountOutcome::NoCode);

        let priced = price_selection(&backend, &ctx, &better_with_roof(), Some("maple25"))
            .await
            .unwrap();
        assert_eq!(priced.estimate.total, Money::from_units(225));
    }

    #[tokio::test]
    async fn unknown_code_prices_like_no_code() {
        let (backend, ctx) = seeded();
        let priced = price_selection(&backend, &ctx, &better_with_roof(), Some("OAK10"))
            .await
            .unwrap();
        assert_eq!(priced.estimate.total, Money::from_units(250));
        assert!(matches!(
            priced.discount,
            DiscountOutcome::Invalid {
                reason: InvalidReason::Unknown,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_price_fails_closed() {
        let (backend, ctx) = seeded();
        let mut o = DryerVentOptions::new(PackageTier::Better);
        o.bird_nest = true;

        match price_selection(&backend, &ctx, &Selection::DryerVent(o), None).await {
            Err(EstimateError::Pricing(PricingError::Unavailable { missing })) => {
                assert_eq!(missing, vec![sku("ACC-BIRD")]);
            }
            other => panic!("expected pricing unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_code_skips_lookup() {
        let (backend, ctx) = seeded();
        assert_eq!(
            resolve_discount(&backend, &ctx, Some("   ")).await.unwrap(),
            DiscountOutcome::NoCode
        );
    }
}
