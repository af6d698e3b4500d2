use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-tenant async mutex registry.
///
/// Every sequence that mutates a tenant's counters and re-evaluates maturity
/// runs under this lock, so two concurrent approvals cannot both observe a
/// pre-promotion state and lose the promotion. Role-request submission takes
/// the same lock, which is coarser than the per-(user, tenant) serialization
/// the single-pending invariant needs.
#[derive(Default)]
pub struct TenantLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, tenant_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(tenant_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
