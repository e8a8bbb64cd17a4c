//! Partner discount codes.
//!
//! A code is looked up remotely by exact match (after trimming and
//! upper-casing). Only an active record reduces the total; an unknown or
//! inactive code is an inline, recoverable outcome and never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hearth_core::Money;

use crate::services::PackageTier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Fixed amount off the subtotal.
    Flat { amount: Money },
    /// Percentage of the subtotal, in basis points (1000 = 10%).
    Percent { bps: u32 },
    /// Fixed amount per package tier; tiers without an entry get nothing.
    PerTier { amounts: BTreeMap<PackageTier, Money> },
}

/// Partner organisation record from the remote partner table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRecord {
    pub code: String,
    pub org_name: String,
    pub active: bool,
    pub kind: DiscountKind,
}

impl DiscountRecord {
    /// Canonical form used for lookups.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }

    /// Discount this record grants on `subtotal` for `tier`, capped so the
    /// total never goes below zero. `None` when the record is inactive or
    /// grants nothing for the tier.
    pub fn amount_for(&self, subtotal: Money, tier: PackageTier) -> Option<Money> {
        if !self.active {
            return None;
        }
        let raw = match &self.kind {
            DiscountKind::Flat { amount } => *amount,
            DiscountKind::Percent { bps } => subtotal.percent_bps(*bps)?,
            DiscountKind::PerTier { amounts } => *amounts.get(&tier)?,
        };
        if raw.is_negative() || raw.is_zero() {
            return None;
        }
        let ceiling = if subtotal.is_negative() { Money::ZERO } else { subtotal };
        Some(raw.min(ceiling))
    }
}

/// The discount actually applied to an estimate, kept with the quote for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub org_name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Unknown,
    Inactive,
}

/// Result of resolving a code the customer typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscountOutcome {
    /// No code entered.
    NoCode,
    Valid { record: DiscountRecord },
    Invalid { code: String, reason: InvalidReason },
}

impl DiscountOutcome {
    /// Classify a lookup result. `record` is whatever the remote lookup
    /// returned for the normalized `code`.
    pub fn resolve(code: Option<&str>, record: Option<DiscountRecord>) -> Self {
        let code = match code.map(DiscountRecord::normalize_code) {
            Some(c) if !c.is_empty() => c,
            _ => return DiscountOutcome::NoCode,
        };
        match record {
            Some(r) if r.active && DiscountRecord::normalize_code(&r.code) == code => {
                DiscountOutcome::Valid { record: r }
            }
            Some(r) if DiscountRecord::normalize_code(&r.code) == code => DiscountOutcome::Invalid {
                code,
                reason: InvalidReason::Inactive,
            },
            _ => DiscountOutcome::Invalid {
                code,
                reason: InvalidReason::Unknown,
            },
        }
    }

    /// The record to price with, if any.
    pub fn record(&self) -> Option<&DiscountRecord> {
        match self {
            DiscountOutcome::Valid { record } => Some(record),
            _ => None,
        }
    }

    /// Inline message for the wizard; `None` when nothing needs saying.
    pub fn message(&self) -> Option<String> {
        match self {
            DiscountOutcome::NoCode => None,
            DiscountOutcome::Valid { record } => {
                Some(format!("{} partner discount applied", record.org_name))
            }
            DiscountOutcome::Invalid { code, reason } => Some(match reason {
                InvalidReason::Unknown => format!("Discount code {code} was not found"),
                InvalidReason::Inactive => format!("Discount code {code} is no longer active"),
            }),
        }
    }
}
