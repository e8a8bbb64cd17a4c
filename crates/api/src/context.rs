use hearth_core::{SessionContext, TenantId};

/// Tenant context for a request.
///
/// Immutable; inserted by the tenant middleware before any domain route runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    session: SessionContext,
}

impl TenantContext {
    pub fn new(session: SessionContext) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn tenant_id(&self) -> TenantId {
        self.session.tenant_id()
    }
}
