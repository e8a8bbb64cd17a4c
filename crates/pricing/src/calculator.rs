//! Pricing calculator: line items + catalog (+ discount) → totals.

use serde::{Deserialize, Serialize};

use hearth_core::Money;

use crate::catalog::{PriceCatalog, Sku};
use crate::composer::{LineItem, LineKind, Selection, compose};
use crate::discount::{AppliedDiscount, DiscountRecord};
use crate::error::PricingError;
use crate::services::{self, PackageTier};

/// One priced line as shown on the review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub label: String,
    pub sku: Sku,
    pub qty: u32,
    pub unit_price: Money,
    /// `unit_price * qty`, negative for credit lines.
    pub amount: Money,
}

/// A fully priced estimate. Derived on every input change; only persisted as
/// part of a quote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateResult {
    pub line_items: Vec<LineItem>,
    pub breakdowns: Vec<Breakdown>,
    pub subtotal: Money,
    pub discount: Option<AppliedDiscount>,
    pub total: Money,
}

impl EstimateResult {
    pub fn discount_amount(&self) -> Money {
        self.discount.as_ref().map(|d| d.amount).unwrap_or(Money::ZERO)
    }
}

/// Price a composed item list.
///
/// Fails closed: if any SKU lacks an active price, the result is
/// [`PricingError::Unavailable`] listing every missing SKU, never a partial
/// sum. `discount` is only honoured when the record is active.
pub fn price(
    items: &[LineItem],
    catalog: &PriceCatalog,
    discount: Option<&DiscountRecord>,
    tier: PackageTier,
) -> Result<EstimateResult, PricingError> {
    catalog.require(items.iter().map(|item| &item.sku))?;

    let mut breakdowns = Vec::with_capacity(items.len());
    for item in items {
        let unit_price = catalog
            .price_of(&item.sku)
            .ok_or_else(|| PricingError::Unavailable {
                missing: vec![item.sku.clone()],
            })?;
        let gross = unit_price.checked_mul(item.qty).ok_or(PricingError::Overflow)?;
        let amount = match item.kind {
            LineKind::Charge => gross,
            LineKind::Credit => gross.checked_neg().ok_or(PricingError::Overflow)?,
        };
        breakdowns.push(Breakdown {
            label: services::sku_label(&item.sku),
            sku: item.sku.clone(),
            qty: item.qty,
            unit_price,
            amount,
        });
    }

    let subtotal =
        Money::checked_sum(breakdowns.iter().map(|b| b.amount)).ok_or(PricingError::Overflow)?;

    let applied = discount.and_then(|record| {
        record.amount_for(subtotal, tier).map(|amount| AppliedDiscount {
            code: record.code.clone(),
            org_name: record.org_name.clone(),
            amount,
        })
    });
    let discount_amount = applied.as_ref().map(|d| d.amount).unwrap_or(Money::ZERO);

    let total = subtotal
        .checked_sub(discount_amount)
        .ok_or(PricingError::Overflow)?
        .max(Money::ZERO);

    Ok(EstimateResult {
        line_items: items.to_vec(),
        breakdowns,
        subtotal,
        discount: applied,
        total,
    })
}

/// Compose and price a selection in one step.
pub fn estimate(
    selection: &Selection,
    catalog: &PriceCatalog,
    discount: Option<&DiscountRecord>,
) -> Result<EstimateResult, PricingError> {
    let items = compose(selection);
    price(&items, catalog, discount, selection.discount_tier())
}
