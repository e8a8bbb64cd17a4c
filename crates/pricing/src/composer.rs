//! Item composer: customer selections → ordered line items.
//!
//! Composition is a pure function of the selection. Order is rule-evaluation
//! order (package, add-ons, extra units, then bundle credit) and only matters
//! for display.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use hearth_core::ValueObject;

use crate::catalog::Sku;
use crate::services::{self, PackageTier, ServiceKind, skus};

/// Whether a line adds to or subtracts from the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    #[default]
    Charge,
    /// Priced at the catalog amount but subtracted (bundle discount).
    Credit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Sku,
    pub qty: u32,
    #[serde(default)]
    pub kind: LineKind,
}

impl ValueObject for LineItem {}

impl LineItem {
    pub fn charge(sku: Sku, qty: u32) -> Self {
        Self {
            sku,
            qty,
            kind: LineKind::Charge,
        }
    }

    pub fn credit(sku: Sku) -> Self {
        Self {
            sku,
            qty: 1,
            kind: LineKind::Credit,
        }
    }
}

fn one() -> u32 {
    1
}

/// Dryer vent cleaning answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryerVentOptions {
    pub tier: PackageTier,
    #[serde(default)]
    pub roof_access: bool,
    #[serde(default)]
    pub new_transition: bool,
    #[serde(default)]
    pub exterior_guard: bool,
    #[serde(default)]
    pub airflow_test: bool,
    #[serde(default)]
    pub bird_nest: bool,
    /// Dryers on site; the first is included in the package.
    #[serde(default = "one")]
    pub dryer_count: u32,
}

impl DryerVentOptions {
    pub fn new(tier: PackageTier) -> Self {
        Self {
            tier,
            roof_access: false,
            new_transition: false,
            exterior_guard: false,
            airflow_test: false,
            bird_nest: false,
            dryer_count: 1,
        }
    }
}

/// Air duct cleaning answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirDuctOptions {
    pub tier: PackageTier,
    #[serde(default)]
    pub sanitize: bool,
    #[serde(default)]
    pub coil_cleaning: bool,
    #[serde(default)]
    pub attic_access: bool,
    #[serde(default)]
    pub roof_access: bool,
    /// HVAC systems in the home; the first is included in the package.
    #[serde(default = "one")]
    pub system_count: u32,
}

impl AirDuctOptions {
    pub fn new(tier: PackageTier) -> Self {
        Self {
            tier,
            sanitize: false,
            coil_cleaning: false,
            attic_access: false,
            roof_access: false,
            system_count: 1,
        }
    }
}

/// Everything the options step of the wizard collects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum Selection {
    DryerVent(DryerVentOptions),
    AirDuct(AirDuctOptions),
    Bundle {
        air_duct: AirDuctOptions,
        dryer_vent: DryerVentOptions,
    },
}

impl Selection {
    pub fn service(&self) -> ServiceKind {
        match self {
            Selection::DryerVent(_) => ServiceKind::DryerVent,
            Selection::AirDuct(_) => ServiceKind::AirDuct,
            Selection::Bundle { .. } => ServiceKind::Bundle,
        }
    }

    /// Tier used for tier-keyed partner discounts. A bundle uses the higher of
    /// its two tiers.
    pub fn discount_tier(&self) -> PackageTier {
        match self {
            Selection::DryerVent(o) => o.tier,
            Selection::AirDuct(o) => o.tier,
            Selection::Bundle {
                air_duct,
                dryer_vent,
            } => air_duct.tier.max(dryer_vent.tier),
        }
    }

    /// Every SKU the composed item list references (deduplicated, sorted).
    pub fn required_skus(&self) -> Vec<Sku> {
        let set: BTreeSet<Sku> = compose(self).into_iter().map(|item| item.sku).collect();
        set.into_iter().collect()
    }
}

/// Accumulates line items, charging each add-on at most once.
#[derive(Debug, Default)]
struct ItemList {
    items: Vec<LineItem>,
    covered: BTreeSet<Sku>,
}

impl ItemList {
    fn package(&mut self, service: ServiceKind, tier: PackageTier) {
        let Some(rule) = services::tier_rule(service, tier) else {
            return;
        };
        self.add(rule.package_sku(), 1);
        self.covered.extend(rule.included_skus());
    }

    fn add_on(&mut self, enabled: bool, code: &'static str) {
        if enabled {
            self.add(Sku::from_static(code), 1);
        }
    }

    /// One unit is included with the package; only the rest are charged.
    fn extra_units(&mut self, code: &'static str, count: u32) {
        let extra = count.saturating_sub(1);
        if extra > 0 {
            self.add(Sku::from_static(code), extra);
        }
    }

    fn add(&mut self, sku: Sku, qty: u32) {
        if self.covered.insert(sku.clone()) {
            self.items.push(LineItem::charge(sku, qty));
        }
    }

    fn credit(&mut self, code: &'static str) {
        self.items.push(LineItem::credit(Sku::from_static(code)));
    }
}

fn dryer_vent(o: &DryerVentOptions, list: &mut ItemList) {
    list.package(ServiceKind::DryerVent, o.tier);
    list.add_on(o.roof_access, skus::ACC_ROOF);
    list.add_on(o.new_transition, skus::DV_TRANS_HD);
    list.add_on(o.exterior_guard, skus::EXT_GUARD_STD);
    list.add_on(o.airflow_test, skus::DV_AIRFLOW);
    list.add_on(o.bird_nest, skus::ACC_BIRD);
    list.extra_units(skus::DV_EXTRA_UNIT, o.dryer_count);
}

fn air_duct(o: &AirDuctOptions, list: &mut ItemList) {
    list.package(ServiceKind::AirDuct, o.tier);
    list.add_on(o.sanitize, skus::AD_SANITIZE);
    list.add_on(o.coil_cleaning, skus::AD_COIL);
    list.add_on(o.attic_access, skus::ACC_ATTIC);
    list.add_on(o.roof_access, skus::ACC_ROOF);
    list.extra_units(skus::AD_EXTRA_SYS, o.system_count);
}

/// Compose the ordered line items for a selection.
pub fn compose(selection: &Selection) -> Vec<LineItem> {
    let mut list = ItemList::default();
    match selection {
        Selection::DryerVent(o) => dryer_vent(o, &mut list),
        Selection::AirDuct(o) => air_duct(o, &mut list),
        Selection::Bundle {
            air_duct: ad,
            dryer_vent: dv,
        } => {
            air_duct(ad, &mut list);
            dryer_vent(dv, &mut list);
            list.credit(skus::BUNDLE_DISC);
        }
    }
    list.items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku(code: &str) -> Sku {
        Sku::new(code).unwrap()
    }

    #[test]
    fn better_dryer_vent_with_roof_access() {
        let mut opts = DryerVentOptions::new(PackageTier::Better);
        opts.roof_access = true;

        let items = compose(&Selection::DryerVent(opts));
        assert_eq!(
            items,
            vec![
                LineItem::charge(sku("PKG-COMP"), 1),
                LineItem::charge(sku("ACC-ROOF"), 1),
            ]
        );
    }

    #[test]
    fn tier_included_add_ons_are_not_charged_again() {
        let mut opts = DryerVentOptions::new(PackageTier::Better);
        opts.new_transition = true;
        opts.exterior_guard = true;

        let items = compose(&Selection::DryerVent(opts));
        assert_eq!(items, vec![LineItem::charge(sku("PKG-COMP"), 1)]);
    }

    #[test]
    fn add_ons_not_in_tier_are_charged() {
        let mut opts = DryerVentOptions::new(PackageTier::Good);
        opts.new_transition = true;
        opts.bird_nest = true;

        let items = compose(&Selection::DryerVent(opts));
        assert_eq!(
            items,
            vec![
                LineItem::charge(sku("PKG-BASIC"), 1),
                LineItem::charge(sku("DV-TRANS-HD"), 1),
                LineItem::charge(sku("ACC-BIRD"), 1),
            ]
        );
    }

    #[test]
    fn single_unit_adds_no_extra_line() {
        let opts = AirDuctOptions::new(PackageTier::Good);
        let items = compose(&Selection::AirDuct(opts));
        assert!(items.iter().all(|i| i.sku != sku("AD-EXTRA-SYS")));
    }

    #[test]
    fn zero_count_is_treated_as_one() {
        let mut opts = DryerVentOptions::new(PackageTier::Good);
        opts.dryer_count = 0;
        let items = compose(&Selection::DryerVent(opts));
        assert_eq!(items, vec![LineItem::charge(sku("PKG-BASIC"), 1)]);
    }

    #[test]
    fn extra_systems_are_count_minus_one() {
        let mut opts = AirDuctOptions::new(PackageTier::Best);
        opts.system_count = 3;
        opts.sanitize = true;

        let items = compose(&Selection::AirDuct(opts));
        assert_eq!(
            items,
            vec![
                LineItem::charge(sku("AD-PREM"), 1),
                LineItem::charge(sku("AD-EXTRA-SYS"), 2),
            ]
        );
    }

    #[test]
    fn bundle_appends_one_credit_and_charges_shared_access_once() {
        let mut ad = AirDuctOptions::new(PackageTier::Better);
        ad.roof_access = true;
        let mut dv = DryerVentOptions::new(PackageTier::Best);
        dv.roof_access = true;

        let items = compose(&Selection::Bundle {
            air_duct: ad,
            dryer_vent: dv,
        });
        assert_eq!(
            items,
            vec![
                LineItem::charge(sku("AD-STD"), 1),
                LineItem::charge(sku("ACC-ROOF"), 1),
                LineItem::charge(sku("PKG-PREM"), 1),
                LineItem::credit(sku("BUNDLE-DISC")),
            ]
        );
    }

    #[test]
    fn bundle_uses_higher_tier_for_discounts() {
        let selection = Selection::Bundle {
            air_duct: AirDuctOptions::new(PackageTier::Good),
            dryer_vent: DryerVentOptions::new(PackageTier::Best),
        };
        assert_eq!(selection.discount_tier(), PackageTier::Best);
        assert_eq!(selection.service(), ServiceKind::Bundle);
    }

    #[test]
    fn required_skus_are_sorted_and_unique() {
        let mut dv = DryerVentOptions::new(PackageTier::Good);
        dv.roof_access = true;
        dv.dryer_count = 2;
        let skus = Selection::DryerVent(dv).required_skus();
        assert_eq!(skus, vec![sku("ACC-ROOF"), sku("DV-EXTRA-UNIT"), sku("PKG-BASIC")]);
    }

    #[test]
    fn selection_deserializes_from_tagged_json() {
        let json = r#"{"service":"dryer_vent","tier":"better","roof_access":true}"#;
        let selection: Selection = serde_json::from_str(json).unwrap();
        match selection {
            Selection::DryerVent(o) => {
                assert_eq!(o.tier, PackageTier::Better);
                assert!(o.roof_access);
                assert_eq!(o.dryer_count, 1);
            }
            other => panic!("expected dryer vent selection, got {other:?}"),
        }

        let json = r#"{"service":"bundle","air_duct":{"tier":"good"},"dryer_vent":{"tier":"best","dryer_count":2}}"#;
        let selection: Selection = serde_json::from_str(json).unwrap();
        assert_eq!(selection.service(), ServiceKind::Bundle);
    }
}
