//! Tenant administration: per-tenant feature flags.
//!
//! Flag toggles are optimistic. The board applies a change locally and hands
//! back a [`PendingToggle`] holding the inverse patch; the caller writes the
//! change remotely and then either commits or rolls back.

pub mod feature_flags;

pub use feature_flags::{FlagBoard, FlagError, FlagKey, FlagPatch, PendingToggle};
