// Data-access boundary for the governance core.
//
// The services consume these traits only; the §3 record invariants (unique
// domains, unique (user, tenant) memberships, at most one pending role
// request) are enforced here at the boundary, whatever the backend.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    DomainApprovalStatus, GlobalRole, MaturityState, Membership, RoleRequest, RequestStatus,
    Tenant, TenantSettings, ThresholdUpdate,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Canonical registry of organizations.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Register a new tenant. Fails with `Duplicate` if the domain is taken.
    async fn create(&self, tenant: Tenant) -> Result<Tenant, StoreError>;

    async fn by_domain(&self, domain: &str) -> Result<Option<Tenant>, StoreError>;

    async fn by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError>;

    async fn list(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Apply a validated threshold update; absent fields are untouched.
    async fn update_thresholds(
        &self,
        id: Uuid,
        update: &ThresholdUpdate,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError>;

    async fn update_settings(
        &self,
        id: Uuid,
        settings: TenantSettings,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError>;

    /// Transition the tenant to mature and rewrite every provisional_admin
    /// membership to admin, as one atomic unit. Idempotent: promoting a
    /// mature tenant returns it unchanged.
    async fn promote(&self, id: Uuid, now: DateTime<Utc>) -> Result<Tenant, StoreError>;

    /// Direct maturity write. Backs the non-production test fixtures only;
    /// production paths go through `promote`.
    async fn set_maturity(
        &self,
        id: Uuid,
        maturity: MaturityState,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError>;
}

/// Per-user, per-tenant role assignments. Every write refreshes the owning
/// tenant's cached admin/steward counters in the same unit.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Add a membership. Fails with `Duplicate` for an existing
    /// (user, tenant) pair.
    async fn insert(&self, membership: Membership) -> Result<Membership, StoreError>;

    async fn find(&self, user_id: Uuid, tenant_id: Uuid)
        -> Result<Option<Membership>, StoreError>;

    async fn set_role(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: GlobalRole,
        now: DateTime<Utc>,
    ) -> Result<Membership, StoreError>;

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Membership>, StoreError>;
}

/// Role elevation requests, kept forever as audit records.
#[async_trait]
pub trait RoleRequestStore: Send + Sync {
    /// Create a pending request. Fails with `Duplicate` while another
    /// pending request exists for the same (user, tenant).
    async fn create(&self, request: RoleRequest) -> Result<RoleRequest, StoreError>;

    async fn by_id(&self, id: Uuid) -> Result<Option<RoleRequest>, StoreError>;

    async fn pending_for(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<RoleRequest>, StoreError>;

    async fn list_pending(&self, tenant_id: Uuid) -> Result<Vec<RoleRequest>, StoreError>;

    /// Move a pending request to its terminal status. Fails with `NotFound`
    /// if the request does not exist or is no longer pending.
    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RoleRequest, StoreError>;
}

/// Ledger gating whether an organization domain may be provisioned or served.
#[async_trait]
pub trait DomainApprovalStore: Send + Sync {
    /// Status for a domain; `Unknown` when no record exists (legacy tenant).
    async fn status(&self, domain: &str) -> Result<DomainApprovalStatus, StoreError>;

    async fn set_status(
        &self,
        domain: &str,
        status: DomainApprovalStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Bundle of the four store handles the services and guard consume.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn TenantStore>,
    pub memberships: Arc<dyn MembershipStore>,
    pub role_requests: Arc<dyn RoleRequestStore>,
    pub approvals: Arc<dyn DomainApprovalStore>,
}

impl Stores {
    /// All four contracts served by one shared in-memory registry.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            tenants: store.clone(),
            memberships: store.clone(),
            role_requests: store.clone(),
            approvals: store,
        }
    }

    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            tenants: store.clone(),
            memberships: store.clone(),
            role_requests: store.clone(),
            approvals: store,
        }
    }
}
