//! Tenant-isolated storage for the in-memory backend.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
