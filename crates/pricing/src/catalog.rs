//! Price book snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hearth_core::{Money, ValueObject};

use crate::error::PricingError;

/// Catalog item code (e.g. `PKG-COMP`).
///
/// Codes are trimmed and upper-cased on construction; lookups are exact after
/// that normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl ValueObject for Sku {}

impl Sku {
    pub fn new(code: impl AsRef<str>) -> Result<Self, PricingError> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(PricingError::InvalidSku(code.to_string()));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PricingError::InvalidSku(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Build from a compile-time rule table code. Codes in the rule tables are
    /// already normalized.
    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sku {
    type Error = PricingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sku::new(value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

/// One row of the remote price book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBookEntry {
    pub code: Sku,
    pub base_price: Money,
    pub active: bool,
}

impl PriceBookEntry {
    pub fn active(code: Sku, base_price: Money) -> Self {
        Self {
            code,
            base_price,
            active: true,
        }
    }
}

/// Read-only SKU → price map built from the active rows of a price book load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriceCatalog {
    prices: BTreeMap<Sku, Money>,
}

impl PriceCatalog {
    /// Build a snapshot from loaded rows.
    ///
    /// Inactive rows are dropped. Two active rows for one SKU, or a negative
    /// price, reject the whole load.
    pub fn from_entries<I>(entries: I) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = PriceBookEntry>,
    {
        let mut prices = BTreeMap::new();
        for entry in entries.into_iter().filter(|e| e.active) {
            if entry.base_price.is_negative() {
                return Err(PricingError::catalog(format!(
                    "negative base price for {}",
                    entry.code
                )));
            }
            if prices.insert(entry.code.clone(), entry.base_price).is_some() {
                return Err(PricingError::DuplicateSku(entry.code));
            }
        }
        Ok(Self { prices })
    }

    pub fn price_of(&self, sku: &Sku) -> Option<Money> {
        self.prices.get(sku).copied()
    }

    pub fn contains(&self, sku: &Sku) -> bool {
        self.prices.contains_key(sku)
    }

    /// Fail closed unless every required SKU has an active price.
    pub fn require<'a, I>(&self, required: I) -> Result<(), PricingError>
    where
        I: IntoIterator<Item = &'a Sku>,
    {
        let mut missing: Vec<Sku> = required
            .into_iter()
            .filter(|sku| !self.contains(sku))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        Err(PricingError::Unavailable { missing })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Sku, Money)> {
        self.prices.iter().map(|(k, v)| (k, *v))
    }
}
