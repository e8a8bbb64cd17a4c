//! Explicit session context.
//!
//! Every capability call (catalog reads, discount lookups, submissions, flag
//! writes) receives the tenant and acting user through this value instead of
//! reading them from process-wide state.

use serde::{Deserialize, Serialize};

use crate::id::{TenantId, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionContext {
    tenant_id: TenantId,
    user_id: Option<UserId>,
}

impl SessionContext {
    /// Context for an anonymous visitor of a tenant's public estimate page.
    pub fn anonymous(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            user_id: None,
        }
    }

    /// Context for a signed-in staff user.
    pub fn for_user(tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tenant_id,
            user_id: Some(user_id),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
