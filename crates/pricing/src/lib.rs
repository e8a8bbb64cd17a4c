//! Estimate pricing (pure, deterministic).
//!
//! - `catalog`: price book snapshot (active SKUs only)
//! - `services`: per-service package tiers and add-on rules
//! - `composer`: customer selections → ordered line items
//! - `discount`: partner discount records and their gating
//! - `calculator`: line items + catalog + discount → totals breakdown
//!
//! No IO happens here; loading the catalog or looking up a discount code is
//! the caller's job (see `hearth-infra`).

pub mod calculator;
pub mod catalog;
pub mod composer;
pub mod discount;
pub mod error;
pub mod services;

pub use calculator::{Breakdown, EstimateResult, estimate, price};
pub use catalog::{PriceBookEntry, PriceCatalog, Sku};
pub use composer::{AirDuctOptions, DryerVentOptions, LineItem, LineKind, Selection, compose};
pub use discount::{AppliedDiscount, DiscountKind, DiscountOutcome, DiscountRecord, InvalidReason};
pub use error::PricingError;
pub use services::{PackageTier, ServiceKind};
