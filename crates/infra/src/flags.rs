//! Optimistic feature-flag toggles against a [`FeatureFlagStore`].
//!
//! One [`FlagBoard`] per tenant is kept in memory. A toggle is applied to the
//! board first, then written remotely; a failed write replays the inverse
//! patch. The board lock is never held across the remote write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{info, warn};

use hearth_core::{SessionContext, TenantId};
use hearth_tenants::{FlagBoard, FlagError, FlagKey};

use crate::backend::{BackendError, FeatureFlagStore};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error(transparent)]
    Flag(#[from] FlagError),

    /// The remote write failed and the local change was rolled back.
    #[error("flag write failed and was rolled back: {0}")]
    RolledBack(BackendError),
}

pub struct FlagToggler<S> {
    store: S,
    boards: Mutex<HashMap<TenantId, FlagBoard>>,
}

impl<S> FlagToggler<S>
where
    S: FeatureFlagStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            boards: Mutex::new(HashMap::new()),
        }
    }

    fn boards(&self) -> MutexGuard<'_, HashMap<TenantId, FlagBoard>> {
        self.boards.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_board<T>(&self, tenant_id: TenantId, f: impl FnOnce(&mut FlagBoard) -> T) -> T {
        let mut boards = self.boards();
        let board = boards
            .entry(tenant_id)
            .or_insert_with(|| FlagBoard::new(tenant_id));
        f(board)
    }

    /// Reload the tenant's flags from the store and return the board view.
    pub async fn refresh(&self, ctx: &SessionContext) -> Result<Vec<(FlagKey, bool)>, BackendError> {
        let snapshot = self.store.list(ctx).await?;
        Ok(self.with_board(ctx.tenant_id(), |board| {
            board.load(snapshot);
            collect(board)
        }))
    }

    /// Current local view without a remote read.
    pub fn snapshot(&self, ctx: &SessionContext) -> Vec<(FlagKey, bool)> {
        self.with_board(ctx.tenant_id(), |board| collect(board))
    }

    /// Set `key` to `enabled`. Returns the value in effect afterwards.
    pub async fn toggle(
        &self,
        ctx: &SessionContext,
        key: FlagKey,
        enabled: bool,
    ) -> Result<bool, ToggleError> {
        let tenant_id = ctx.tenant_id();
        let pending = self.with_board(tenant_id, |board| board.begin_toggle(key, enabled))?;

        match self.store.write(ctx, pending.patch()).await {
            Ok(()) => {
                let key = pending.patch().key.clone();
                self.with_board(tenant_id, |board| board.commit(pending))?;
                info!(tenant_id = %tenant_id, key = %key, enabled, "feature flag updated");
                Ok(enabled)
            }
            Err(e) => {
                let key = pending.patch().key.clone();
                self.with_board(tenant_id, |board| board.rollback(pending))?;
                warn!(tenant_id = %tenant_id, key = %key, error = %e, "feature flag write failed, rolled back");
                Err(ToggleError::RolledBack(e))
            }
        }
    }
}

fn collect(board: &FlagBoard) -> Vec<(FlagKey, bool)> {
    board.iter().map(|(k, v)| (k.clone(), v)).collect()
}
