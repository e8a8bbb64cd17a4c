use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hearth_core::TenantId;

const MAX_KEY_LEN: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlagError {
    #[error("invalid flag key `{0}`")]
    InvalidKey(String),

    /// A toggle for this key is waiting on its remote write.
    #[error("flag `{0}` has a toggle in flight")]
    InFlight(FlagKey),

    #[error("toggle does not belong to this tenant")]
    TenantMismatch,

    /// Already committed/rolled back, or superseded by a snapshot reset.
    #[error("no pending toggle #{0}")]
    UnknownToggle(u64),
}

/// Flag name, e.g. `ai_scripts` or `estimates.bundle`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagKey(String);

impl FlagKey {
    pub fn new(raw: &str) -> Result<Self, FlagError> {
        let key = raw.trim().to_ascii_lowercase();
        let mut chars = key.chars();
        let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.');
        if !starts_alpha || !rest_ok || key.len() > MAX_KEY_LEN {
            return Err(FlagError::InvalidKey(raw.to_string()));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FlagKey {
    type Error = FlagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<FlagKey> for String {
    fn from(value: FlagKey) -> Self {
        value.0
    }
}

impl core::fmt::Display for FlagKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-flag state change. `enabled: None` means the flag is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagPatch {
    pub key: FlagKey,
    pub enabled: Option<bool>,
}

/// Proof of an applied-but-unconfirmed toggle.
///
/// Consumed by exactly one of [`FlagBoard::commit`] or [`FlagBoard::rollback`].
#[derive(Debug, PartialEq, Eq)]
pub struct PendingToggle {
    tenant_id: TenantId,
    ticket: u64,
    patch: FlagPatch,
    inverse: FlagPatch,
}

impl PendingToggle {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// The change to write remotely.
    pub fn patch(&self) -> &FlagPatch {
        &self.patch
    }

    /// The change that undoes `patch` locally.
    pub fn inverse(&self) -> &FlagPatch {
        &self.inverse
    }
}

/// Local view of one tenant's feature flags.
#[derive(Debug, Clone)]
pub struct FlagBoard {
    tenant_id: TenantId,
    flags: BTreeMap<FlagKey, bool>,
    pending: BTreeMap<FlagKey, u64>,
    next_ticket: u64,
}

impl FlagBoard {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            flags: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_ticket: 0,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Replace the board with a freshly loaded snapshot.
    ///
    /// Keys with a toggle in flight keep their local value.
    pub fn load<I>(&mut self, snapshot: I)
    where
        I: IntoIterator<Item = (FlagKey, bool)>,
    {
        let mut next: BTreeMap<FlagKey, bool> = snapshot.into_iter().collect();
        for key in self.pending.keys() {
            match self.flags.get(key) {
                Some(v) => {
                    next.insert(key.clone(), *v);
                }
                None => {
                    next.remove(key);
                }
            }
        }
        self.flags = next;
    }

    pub fn get(&self, key: &FlagKey) -> Option<bool> {
        self.flags.get(key).copied()
    }

    /// Unset flags are off.
    pub fn is_enabled(&self, key: &FlagKey) -> bool {
        self.get(key).unwrap_or(false)
    }

    pub fn is_pending(&self, key: &FlagKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FlagKey, bool)> {
        self.flags.iter().map(|(k, v)| (k, *v))
    }

    /// Phase one: apply `enabled` locally and return the pending toggle.
    pub fn begin_toggle(&mut self, key: FlagKey, enabled: bool) -> Result<PendingToggle, FlagError> {
        if self.pending.contains_key(&key) {
            return Err(FlagError::InFlight(key));
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let previous = self.flags.insert(key.clone(), enabled);
        self.pending.insert(key.clone(), ticket);

        Ok(PendingToggle {
            tenant_id: self.tenant_id,
            ticket,
            patch: FlagPatch {
                key: key.clone(),
                enabled: Some(enabled),
            },
            inverse: FlagPatch {
                key,
                enabled: previous,
            },
        })
    }

    /// Phase two (remote write succeeded): keep the local change.
    pub fn commit(&mut self, toggle: PendingToggle) -> Result<(), FlagError> {
        self.settle(&toggle)
    }

    /// Phase two (remote write failed): replay the inverse patch.
    pub fn rollback(&mut self, toggle: PendingToggle) -> Result<(), FlagError> {
        self.settle(&toggle)?;
        self.apply(&toggle.inverse);
        Ok(())
    }

    fn settle(&mut self, toggle: &PendingToggle) -> Result<(), FlagError> {
        if toggle.tenant_id != self.tenant_id {
            return Err(FlagError::TenantMismatch);
        }
        match self.pending.get(&toggle.patch.key) {
            Some(ticket) if *ticket == toggle.ticket => {
                self.pending.remove(&toggle.patch.key);
                Ok(())
            }
            _ => Err(FlagError::UnknownToggle(toggle.ticket)),
        }
    }

    fn apply(&mut self, patch: &FlagPatch) {
        match patch.enabled {
            Some(v) => {
                self.flags.insert(patch.key.clone(), v);
            }
            None => {
                self.flags.remove(&patch.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> FlagKey {
        FlagKey::new(s).unwrap()
    }

    fn board() -> FlagBoard {
        let mut b = FlagBoard::new(TenantId::new());
        b.load([(key("ai_scripts"), false), (key("estimates.bundle"), true)]);
        b
    }

    #[test]
    fn flag_keys_are_normalized_and_validated() {
        assert_eq!(key(" AI_Scripts ").as_str(), "ai_scripts");
        assert!(FlagKey::new("").is_err());
        assert!(FlagKey::new("9lives").is_err());
        assert!(FlagKey::new("has space").is_err());
        assert!(FlagKey::new(&"a".repeat(65)).is_err());

        let parsed: FlagKey = serde_json::from_str("\"call_console\"").unwrap();
        assert_eq!(parsed, key("call_console"));
        assert!(serde_json::from_str::<FlagKey>("\"bad key\"").is_err());
    }

    #[test]
    fn toggle_applies_locally_before_commit() {
        let mut b = board();
        let t = b.begin_toggle(key("ai_scripts"), true).unwrap();
        assert!(b.is_enabled(&key("ai_scripts")));
        assert!(b.is_pending(&key("ai_scripts")));
        assert_eq!(t.patch().enabled, Some(true));
        assert_eq!(t.inverse().enabled, Some(false));

        b.commit(t).unwrap();
        assert!(b.is_enabled(&key("ai_scripts")));
        assert!(!b.is_pending(&key("ai_scripts")));
    }

    #[test]
    fn rollback_replays_inverse() {
        let mut b = board();
        let t = b.begin_toggle(key("estimates.bundle"), false).unwrap();
        assert!(!b.is_enabled(&key("estimates.bundle")));

        b.rollback(t).unwrap();
        assert_eq!(b.get(&key("estimates.bundle")), Some(true));
    }

    #[test]
    fn rollback_of_new_flag_unsets_it() {
        let mut b = board();
        let t = b.begin_toggle(key("diagnostics"), true).unwrap();
        assert_eq!(t.inverse().enabled, None);

        b.rollback(t).unwrap();
        assert_eq!(b.get(&key("diagnostics")), None);
        assert!(!b.is_enabled(&key("diagnostics")));
    }

    #[test]
    fn second_toggle_waits_for_first() {
        let mut b = board();
        let _t = b.begin_toggle(key("ai_scripts"), true).unwrap();
        assert_eq!(
            b.begin_toggle(key("ai_scripts"), false),
            Err(FlagError::InFlight(key("ai_scripts")))
        );
        // other keys are independent
        assert!(b.begin_toggle(key("estimates.bundle"), false).is_ok());
    }

    #[test]
    fn toggle_from_other_board_is_rejected() {
        let mut a = board();
        let mut b = board();
        let t = a.begin_toggle(key("ai_scripts"), true).unwrap();
        assert_eq!(b.commit(t), Err(FlagError::TenantMismatch));
    }

    #[test]
    fn snapshot_load_keeps_in_flight_value() {
        let mut b = board();
        let t = b.begin_toggle(key("ai_scripts"), true).unwrap();

        b.load([(key("ai_scripts"), false), (key("call_console"), true)]);
        assert!(b.is_enabled(&key("ai_scripts")));
        assert!(b.is_enabled(&key("call_console")));
        assert_eq!(b.get(&key("estimates.bundle")), None);

        b.rollback(t).unwrap();
        assert!(!b.is_enabled(&key("ai_scripts")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn begin_then_rollback_restores_board(
                initial in proptest::option::of(any::<bool>()),
                enabled in any::<bool>(),
            ) {
                let mut b = FlagBoard::new(TenantId::new());
                let k = key("ai_scripts");
                if let Some(v) = initial {
                    b.load([(k.clone(), v)]);
                }
                let before: Vec<(FlagKey, bool)> = b.iter().map(|(k, v)| (k.clone(), v)).collect();

                let t = b.begin_toggle(k.clone(), enabled).unwrap();
                b.rollback(t).unwrap();

                let after: Vec<(FlagKey, bool)> = b.iter().map(|(k, v)| (k.clone(), v)).collect();
                prop_assert_eq!(before, after);
                prop_assert!(!b.is_pending(&k));
            }
        }
    }
}
