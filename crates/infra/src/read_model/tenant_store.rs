use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hearth_core::TenantId;

/// Tenant-isolated key/value store used by the in-memory backend.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V>;
    /// All entries of one tenant, in key order.
    fn entries(&self, tenant_id: TenantId) -> Vec<(K, V)>;
    fn clear_tenant(&self, tenant_id: TenantId);
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        (**self).remove(tenant_id, key)
    }

    fn entries(&self, tenant_id: TenantId) -> Vec<(K, V)> {
        (**self).entries(tenant_id)
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        (**self).clear_tenant(tenant_id)
    }
}

/// Ordered in-memory store keyed by `(tenant, key)`.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<BTreeMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    // A panic while holding the lock leaves the map itself intact.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<(TenantId, K), V>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<(TenantId, K), V>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        self.read().get(&(tenant_id, key.clone())).cloned()
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        self.write().insert((tenant_id, key), value);
    }

    fn remove(&self, tenant_id: TenantId, key: &K) -> Option<V> {
        self.write().remove(&(tenant_id, key.clone()))
    }

    fn entries(&self, tenant_id: TenantId) -> Vec<(K, V)> {
        self.read()
            .iter()
            .filter(|((t, _), _)| *t == tenant_id)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect()
    }

    fn clear_tenant(&self, tenant_id: TenantId) {
        self.write().retain(|(t, _k), _v| *t != tenant_id);
    }
}
