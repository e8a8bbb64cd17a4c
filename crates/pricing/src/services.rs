//! Service offerings: package tiers, included add-ons and add-on SKUs.
//!
//! These tables are the single source of the composition rules. Prices are not
//! here; they come from the price book.

use serde::{Deserialize, Serialize};

use crate::catalog::Sku;

/// Catalog codes referenced by the composition rules.
pub mod skus {
    pub const PKG_BASIC: &str = "PKG-BASIC";
    pub const PKG_COMP: &str = "PKG-COMP";
    pub const PKG_PREM: &str = "PKG-PREM";
    pub const DV_TRANS_HD: &str = "DV-TRANS-HD";
    pub const EXT_GUARD_STD: &str = "EXT-GUARD-STD";
    pub const DV_AIRFLOW: &str = "DV-AIRFLOW";
    pub const DV_EXTRA_UNIT: &str = "DV-EXTRA-UNIT";

    pub const AD_BASIC: &str = "AD-BASIC";
    pub const AD_STD: &str = "AD-STD";
    pub const AD_PREM: &str = "AD-PREM";
    pub const AD_SANITIZE: &str = "AD-SANITIZE";
    pub const AD_COIL: &str = "AD-COIL";
    pub const AD_EXTRA_SYS: &str = "AD-EXTRA-SYS";

    pub const ACC_ROOF: &str = "ACC-ROOF";
    pub const ACC_ATTIC: &str = "ACC-ATTIC";
    pub const ACC_BIRD: &str = "ACC-BIRD";

    pub const BUNDLE_DISC: &str = "BUNDLE-DISC";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    DryerVent,
    AirDuct,
    /// Air duct + dryer vent in one visit.
    Bundle,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::DryerVent => "dryer_vent",
            ServiceKind::AirDuct => "air_duct",
            ServiceKind::Bundle => "bundle",
        }
    }
}

/// Package tier, ordered from cheapest to most inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Good,
    Better,
    Best,
}

impl PackageTier {
    pub const ALL: [PackageTier; 3] = [PackageTier::Good, PackageTier::Better, PackageTier::Best];

    pub fn as_str(self) -> &'static str {
        match self {
            PackageTier::Good => "good",
            PackageTier::Better => "better",
            PackageTier::Best => "best",
        }
    }
}

/// What one tier of one service contributes before add-ons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRule {
    pub package: &'static str,
    pub includes: &'static [&'static str],
}

impl TierRule {
    pub fn package_sku(&self) -> Sku {
        Sku::from_static(self.package)
    }

    pub fn included_skus(&self) -> impl Iterator<Item = Sku> + '_ {
        self.includes.iter().copied().map(Sku::from_static)
    }
}

static DRYER_VENT_TIERS: [TierRule; 3] = [
    TierRule {
        package: skus::PKG_BASIC,
        includes: &[],
    },
    TierRule {
        package: skus::PKG_COMP,
        includes: &[skus::DV_TRANS_HD, skus::EXT_GUARD_STD],
    },
    TierRule {
        package: skus::PKG_PREM,
        includes: &[skus::DV_TRANS_HD, skus::EXT_GUARD_STD, skus::DV_AIRFLOW],
    },
];

static AIR_DUCT_TIERS: [TierRule; 3] = [
    TierRule {
        package: skus::AD_BASIC,
        includes: &[],
    },
    TierRule {
        package: skus::AD_STD,
        includes: &[skus::AD_SANITIZE],
    },
    TierRule {
        package: skus::AD_PREM,
        includes: &[skus::AD_SANITIZE, skus::AD_COIL],
    },
];

/// Tier rule for a single (non-bundle) service.
///
/// Returns `None` for [`ServiceKind::Bundle`], which has no tier of its own.
pub fn tier_rule(service: ServiceKind, tier: PackageTier) -> Option<&'static TierRule> {
    let table = match service {
        ServiceKind::DryerVent => &DRYER_VENT_TIERS,
        ServiceKind::AirDuct => &AIR_DUCT_TIERS,
        ServiceKind::Bundle => return None,
    };
    let idx = match tier {
        PackageTier::Good => 0,
        PackageTier::Better => 1,
        PackageTier::Best => 2,
    };
    Some(&table[idx])
}

/// Display label for a catalog code; unknown codes are shown verbatim.
pub fn sku_label(sku: &Sku) -> String {
    let label = match sku.as_str() {
        skus::PKG_BASIC => "Dryer vent cleaning (basic)",
        skus::PKG_COMP => "Dryer vent cleaning (complete)",
        skus::PKG_PREM => "Dryer vent cleaning (premium)",
        skus::DV_TRANS_HD => "Heavy-duty transition hose",
        skus::EXT_GUARD_STD => "Exterior vent guard",
        skus::DV_AIRFLOW => "Airflow performance test",
        skus::DV_EXTRA_UNIT => "Additional dryer",
        skus::AD_BASIC => "Air duct cleaning (basic)",
        skus::AD_STD => "Air duct cleaning (standard)",
        skus::AD_PREM => "Air duct cleaning (premium)",
        skus::AD_SANITIZE => "Duct sanitizing treatment",
        skus::AD_COIL => "Evaporator coil cleaning",
        skus::AD_EXTRA_SYS => "Additional HVAC system",
        skus::ACC_ROOF => "Roof access",
        skus::ACC_ATTIC => "Attic access",
        skus::ACC_BIRD => "Bird nest removal",
        skus::BUNDLE_DISC => "Bundle discount",
        other => return other.to_string(),
    };
    label.to_string()
}
