//! Table row shapes shared by the PostgREST and Postgres adapters.
//!
//! Prices arrive as JSON numbers (`250`, `19.99`) or numeric strings
//! (`"250.00"`). They are parsed from their decimal text, never through `f64`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use hearth_core::Money;
use hearth_pricing::{DiscountKind, DiscountRecord, PackageTier, PriceBookEntry, Sku};

use super::BackendError;

/// `price_book` row.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PriceBookRow {
    pub code: String,
    pub base_price: JsonValue,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl PriceBookRow {
    pub fn into_entry(self) -> Result<PriceBookEntry, BackendError> {
        let code = Sku::new(&self.code).map_err(|e| BackendError::Decode(e.to_string()))?;
        let base_price = money_from_json(&self.base_price)
            .map_err(|e| BackendError::Decode(format!("price of {code}: {e}")))?;
        Ok(PriceBookEntry {
            code,
            base_price,
            active: self.active,
        })
    }
}

/// `partner_discounts` row.
///
/// `discount_type` is `flat` (uses `amount`), `percent` (uses `percent_bps`)
/// or `per_tier` (uses `tier_amounts`, keyed by tier name).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DiscountRow {
    pub code: String,
    pub org_name: String,
    pub active: bool,
    #[serde(default)]
    pub discount_type: Option<String>,
    #[serde(default)]
    pub amount: Option<JsonValue>,
    #[serde(default)]
    pub percent_bps: Option<u32>,
    #[serde(default)]
    pub tier_amounts: Option<BTreeMap<String, JsonValue>>,
}

impl DiscountRow {
    pub fn into_record(self) -> Result<DiscountRecord, BackendError> {
        let kind = match self.discount_type.as_deref().unwrap_or("flat") {
            "flat" => {
                let amount = self
                    .amount
                    .as_ref()
                    .ok_or_else(|| BackendError::Decode(format!("discount {} has no amount", self.code)))?;
                DiscountKind::Flat {
                    amount: money_from_json(amount)?,
                }
            }
            "percent" => DiscountKind::Percent {
                bps: self.percent_bps.ok_or_else(|| {
                    BackendError::Decode(format!("discount {} has no percent_bps", self.code))
                })?,
            },
            "per_tier" => {
                let mut amounts = BTreeMap::new();
                for (tier, value) in self.tier_amounts.unwrap_or_default() {
                    let tier: PackageTier = serde_json::from_value(JsonValue::String(tier))
                        .map_err(|e| BackendError::Decode(e.to_string()))?;
                    amounts.insert(tier, money_from_json(&value)?);
                }
                DiscountKind::PerTier { amounts }
            }
            other => {
                return Err(BackendError::Decode(format!(
                    "unknown discount_type `{other}`"
                )));
            }
        };

        Ok(DiscountRecord {
            code: DiscountRecord::normalize_code(&self.code),
            org_name: self.org_name,
            active: self.active,
            kind,
        })
    }
}

/// `tenant_features` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FeatureRow {
    pub key: String,
    pub enabled: bool,
}

pub(crate) fn money_from_json(value: &JsonValue) -> Result<Money, BackendError> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => return Err(BackendError::Decode(format!("expected money, got {other}"))),
    };
    Money::parse_decimal(&text).map_err(|e| BackendError::Decode(format!("{text}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn money_decodes_numbers_and_strings() {
        assert_eq!(money_from_json(&json!(250)).unwrap(), Money::from_units(250));
        assert_eq!(money_from_json(&json!(19.99)).unwrap(), Money::from_cents(1999));
        assert_eq!(money_from_json(&json!("30.50")).unwrap(), Money::from_cents(3050));
        assert!(money_from_json(&json!(null)).is_err());
        assert!(money_from_json(&json!("abc")).is_err());
    }

    #[test]
    fn price_rows_become_entries() {
        let row: PriceBookRow =
            serde_json::from_value(json!({"code": "pkg-comp", "base_price": "200.00", "active": true}))
                .unwrap();
        let entry = row.into_entry().unwrap();
        assert_eq!(entry.code.as_str(), "PKG-COMP");
        assert_eq!(entry.base_price, Money::from_units(200));
    }

    #[test]
    fn discount_rows_by_type() {
        let flat: DiscountRow = serde_json::from_value(
            json!({"code": "maple25 ", "org_name": "Maple Realty", "active": true, "amount": 25}),
        )
        .unwrap();
        let record = flat.into_record().unwrap();
        assert_eq!(record.code, "MAPLE25");
        assert_eq!(
            record.kind,
            DiscountKind::Flat {
                amount: Money::from_units(25)
            }
        );

        let pct: DiscountRow = serde_json::from_value(json!({
            "code": "VET10", "org_name": "VFW", "active": true,
            "discount_type": "percent", "percent_bps": 1000
        }))
        .unwrap();
        assert_eq!(pct.into_record().unwrap().kind, DiscountKind::Percent { bps: 1000 });

        let tiers: DiscountRow = serde_json::from_value(json!({
            "code": "HOA", "org_name": "Oak HOA", "active": false,
            "discount_type": "per_tier", "tier_amounts": {"better": "15", "best": 40}
        }))
        .unwrap();
        let record = tiers.into_record().unwrap();
        assert!(!record.active);
        match record.kind {
            DiscountKind::PerTier { amounts } => {
                assert_eq!(amounts.get(&PackageTier::Best), Some(&Money::from_units(40)));
                assert_eq!(amounts.get(&PackageTier::Good), None);
            }
            other => panic!("expected per-tier, got {other:?}"),
        }

        let bad = DiscountRow {
            code: "X".into(),
            discount_type: Some("bogus".into()),
            ..DiscountRow::default()
        };
        assert!(bad.into_record().is_err());
    }
}
