// In-memory store. Authoritative for tests and the default backend in
// development when no DATABASE_URL is configured.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    DomainApprovalStatus, GlobalRole, MaturityState, Membership, RequestStatus, RoleRequest,
    Tenant, TenantSettings, ThresholdUpdate,
};

use super::{
    DomainApprovalStore, MembershipStore, RoleRequestStore, StoreError, TenantStore,
};

#[derive(Default)]
struct Inner {
    tenants: HashMap<Uuid, Tenant>,
    // (user_id, tenant_id) -> membership
    memberships: HashMap<(Uuid, Uuid), Membership>,
    requests: HashMap<Uuid, RoleRequest>,
    approvals: HashMap<String, DomainApprovalStatus>,
}

impl Inner {
    fn tenant_mut(&mut self, id: Uuid) -> Result<&mut Tenant, StoreError> {
        self.tenants
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))
    }

    /// Recompute the cached counters from the membership records.
    /// admin_count covers both admin and provisional_admin.
    fn refresh_counters(&mut self, tenant_id: Uuid, now: DateTime<Utc>) {
        let mut admins = 0;
        let mut stewards = 0;
        for membership in self.memberships.values() {
            if membership.tenant_id != tenant_id {
                continue;
            }
            match membership.role {
                GlobalRole::Admin | GlobalRole::ProvisionalAdmin => admins += 1,
                GlobalRole::Steward => stewards += 1,
                GlobalRole::User => {}
            }
        }
        if let Some(tenant) = self.tenants.get_mut(&tenant_id) {
            tenant.admin_count = admins;
            tenant.steward_count = stewards;
            tenant.updated_at = now;
        }
    }
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn create(&self, tenant: Tenant) -> Result<Tenant, StoreError> {
        let mut inner = self.write();
        if inner.tenants.values().any(|t| t.domain == tenant.domain) {
            return Err(StoreError::Duplicate(format!("tenant {}", tenant.domain)));
        }
        inner.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn by_domain(&self, domain: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read().tenants.values().find(|t| t.domain == domain).cloned())
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        Ok(self.read().tenants.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, StoreError> {
        let mut tenants: Vec<Tenant> = self.read().tenants.values().cloned().collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tenants)
    }

    async fn update_thresholds(
        &self,
        id: Uuid,
        update: &ThresholdUpdate,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let mut inner = self.write();
        let tenant = inner.tenant_mut(id)?;
        if let Some(age) = update.age_days_threshold {
            tenant.age_days_threshold = age;
        }
        if let Some(users) = update.user_threshold {
            tenant.user_threshold = users;
        }
        if let Some(admins) = update.admin_threshold {
            tenant.admin_threshold = admins;
        }
        tenant.updated_at = now;
        Ok(tenant.clone())
    }

    async fn update_settings(
        &self,
        id: Uuid,
        settings: TenantSettings,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let mut inner = self.write();
        let tenant = inner.tenant_mut(id)?;
        tenant.settings = settings;
        tenant.updated_at = now;
        Ok(tenant.clone())
    }

    async fn promote(&self, id: Uuid, now: DateTime<Utc>) -> Result<Tenant, StoreError> {
        let mut inner = self.write();
        let tenant = inner.tenant_mut(id)?;
        if tenant.maturity == MaturityState::Mature {
            return Ok(tenant.clone());
        }
        tenant.maturity = MaturityState::Mature;

        // Provisional trust is corroborated: rewrite in the same unit as the
        // state change so no provisional_admin survives in a mature tenant.
        for membership in inner.memberships.values_mut() {
            if membership.tenant_id == id && membership.role == GlobalRole::ProvisionalAdmin {
                membership.role = GlobalRole::Admin;
                membership.updated_at = now;
            }
        }
        inner.refresh_counters(id, now);
        Ok(inner.tenants[&id].clone())
    }

    async fn set_maturity(
        &self,
        id: Uuid,
        maturity: MaturityState,
        now: DateTime<Utc>,
    ) -> Result<Tenant, StoreError> {
        let mut inner = self.write();
        let tenant = inner.tenant_mut(id)?;
        tenant.maturity = maturity;
        tenant.updated_at = now;
        Ok(tenant.clone())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn insert(&self, membership: Membership) -> Result<Membership, StoreError> {
        let mut inner = self.write();
        let key = (membership.user_id, membership.tenant_id);
        if inner.memberships.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "membership for user {} in tenant {}",
                membership.user_id, membership.tenant_id
            )));
        }
        inner.memberships.insert(key, membership.clone());
        inner.refresh_counters(membership.tenant_id, membership.updated_at);
        Ok(membership)
    }

    async fn find(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self.read().memberships.get(&(user_id, tenant_id)).cloned())
    }

    async fn set_role(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: GlobalRole,
        now: DateTime<Utc>,
    ) -> Result<Membership, StoreError> {
        let mut inner = self.write();
        let membership = inner
            .memberships
            .get_mut(&(user_id, tenant_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!("membership for user {} in tenant {}", user_id, tenant_id))
            })?;
        membership.role = role;
        membership.updated_at = now;
        let membership = membership.clone();
        inner.refresh_counters(tenant_id, now);
        Ok(membership)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let mut members: Vec<Membership> = self
            .read()
            .memberships
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(members)
    }
}

#[async_trait]
impl RoleRequestStore for MemoryStore {
    async fn create(&self, request: RoleRequest) -> Result<RoleRequest, StoreError> {
        let mut inner = self.write();
        let duplicate = inner.requests.values().any(|r| {
            r.user_id == request.user_id && r.tenant_id == request.tenant_id && r.is_pending()
        });
        if duplicate {
            return Err(StoreError::Duplicate(format!(
                "pending role request for user {} in tenant {}",
                request.user_id, request.tenant_id
            )));
        }
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<RoleRequest>, StoreError> {
        Ok(self.read().requests.get(&id).cloned())
    }

    async fn pending_for(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<RoleRequest>, StoreError> {
        Ok(self
            .read()
            .requests
            .values()
            .find(|r| r.user_id == user_id && r.tenant_id == tenant_id && r.is_pending())
            .cloned())
    }

    async fn list_pending(&self, tenant_id: Uuid) -> Result<Vec<RoleRequest>, StoreError> {
        let mut requests: Vec<RoleRequest> = self
            .read()
            .requests
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.is_pending())
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: RequestStatus,
        resolved_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RoleRequest, StoreError> {
        let mut inner = self.write();
        let request = inner
            .requests
            .get_mut(&id)
            .filter(|r| r.is_pending())
            .ok_or_else(|| StoreError::NotFound(format!("pending role request {}", id)))?;
        request.status = status;
        request.resolved_by = Some(resolved_by);
        request.resolved_at = Some(now);
        Ok(request.clone())
    }
}

#[async_trait]
impl DomainApprovalStore for MemoryStore {
    async fn status(&self, domain: &str) -> Result<DomainApprovalStatus, StoreError> {
        Ok(self
            .read()
            .approvals
            .get(domain)
            .copied()
            .unwrap_or(DomainApprovalStatus::Unknown))
    }

    async fn set_status(
        &self,
        domain: &str,
        status: DomainApprovalStatus,
        _now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.write().approvals.insert(domain.to_string(), status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestedRole;

    async fn seeded_tenant(store: &MemoryStore) -> Tenant {
        let now = Utc::now();
        let tenant = TenantStore::create(store, Tenant::provision("acme.com", 30, 0, 2, now))
            .await
            .unwrap();
        MembershipStore::insert(
            store,
            Membership::new(Uuid::new_v4(), tenant.id, GlobalRole::ProvisionalAdmin, now),
        )
        .await
        .unwrap();
        TenantStore::by_id(store, tenant.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn counters_derive_from_memberships() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant = TenantStore::create(&store, Tenant::provision("acme.com", 30, 0, 2, now))
            .await
            .unwrap();

        for role in [GlobalRole::ProvisionalAdmin, GlobalRole::Steward, GlobalRole::User] {
            MembershipStore::insert(&store, Membership::new(Uuid::new_v4(), tenant.id, role, now))
                .await
                .unwrap();
        }

        let tenant = TenantStore::by_id(&store, tenant.id).await.unwrap().unwrap();
        assert_eq!(tenant.admin_count, 1);
        assert_eq!(tenant.steward_count, 1);
    }

    #[tokio::test]
    async fn duplicate_membership_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant = TenantStore::create(&store, Tenant::provision("acme.com", 30, 0, 2, now))
            .await
            .unwrap();
        let user = Uuid::new_v4();

        MembershipStore::insert(&store, Membership::new(user, tenant.id, GlobalRole::User, now))
            .await
            .unwrap();
        let err = MembershipStore::insert(
            &store,
            Membership::new(user, tenant.id, GlobalRole::User, now),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn promotion_rewrites_provisional_admins_atomically() {
        let store = MemoryStore::new();
        let tenant = seeded_tenant(&store).await;
        assert_eq!(tenant.admin_count, 1);

        let now = Utc::now();
        let promoted = TenantStore::promote(&store, tenant.id, now).await.unwrap();
        assert_eq!(promoted.maturity, MaturityState::Mature);

        let members = MembershipStore::list_for_tenant(&store, tenant.id).await.unwrap();
        assert!(members.iter().all(|m| m.role != GlobalRole::ProvisionalAdmin));
        assert!(members.iter().any(|m| m.role == GlobalRole::Admin));

        // Idempotent: a second promote is a no-op, not an error.
        let again = TenantStore::promote(&store, tenant.id, Utc::now()).await.unwrap();
        assert_eq!(again.maturity, MaturityState::Mature);
    }

    #[tokio::test]
    async fn single_pending_request_invariant() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant = TenantStore::create(&store, Tenant::provision("acme.com", 30, 0, 2, now))
            .await
            .unwrap();
        let user = Uuid::new_v4();

        let first = RoleRequestStore::create(
            &store,
            RoleRequest::new(user, tenant.id, RequestedRole::Steward, "on-call".into(), now),
        )
        .await
        .unwrap();

        let err = RoleRequestStore::create(
            &store,
            RoleRequest::new(user, tenant.id, RequestedRole::Admin, "again".into(), now),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // After resolution (either outcome) a new submission succeeds.
        RoleRequestStore::resolve(&store, first.id, RequestStatus::Rejected, Uuid::new_v4(), now)
            .await
            .unwrap();
        RoleRequestStore::create(
            &store,
            RoleRequest::new(user, tenant.id, RequestedRole::Admin, "retry".into(), now),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn resolving_a_resolved_request_is_not_found() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant = TenantStore::create(&store, Tenant::provision("acme.com", 30, 0, 2, now))
            .await
            .unwrap();
        let request = RoleRequestStore::create(
            &store,
            RoleRequest::new(Uuid::new_v4(), tenant.id, RequestedRole::Steward, "x".into(), now),
        )
        .await
        .unwrap();

        RoleRequestStore::resolve(&store, request.id, RequestStatus::Approved, Uuid::new_v4(), now)
            .await
            .unwrap();
        let err = RoleRequestStore::resolve(
            &store,
            request.id,
            RequestStatus::Rejected,
            Uuid::new_v4(),
            now,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_domain_has_unknown_status() {
        let store = MemoryStore::new();
        let status = DomainApprovalStore::status(&store, "legacy.com").await.unwrap();
        assert_eq!(status, DomainApprovalStatus::Unknown);
        assert!(status.permits_access());
    }
}
