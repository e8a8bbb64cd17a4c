use thiserror::Error;

use crate::catalog::Sku;

/// Pricing failure. Every variant is a fail-closed condition: callers must
/// show "pricing unavailable, please call us" rather than a total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// One or more composed SKUs have no active price.
    #[error("pricing unavailable: no active price for {}", join_skus(.missing))]
    Unavailable { missing: Vec<Sku> },

    /// The price book could not be loaded or was malformed.
    #[error("price catalog unavailable: {0}")]
    Catalog(String),

    /// Two active rows share a SKU.
    #[error("duplicate active price book entry for {0}")]
    DuplicateSku(Sku),

    #[error("invalid sku '{0}'")]
    InvalidSku(String),

    /// Arithmetic overflow while totalling.
    #[error("estimate total overflowed")]
    Overflow,
}

impl PricingError {
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }
}

fn join_skus(skus: &[Sku]) -> String {
    skus.iter().map(Sku::as_str).collect::<Vec<_>>().join(", ")
}
