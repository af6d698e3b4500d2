// Maturity lifecycle: the pure promotion predicate plus the orchestration
// that applies it under the per-tenant lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Tenant, ThresholdUpdate};
use crate::error::ApiError;
use crate::events::{EventBus, GovernanceEvent};
use crate::store::Stores;

use super::locks::TenantLocks;

/// Outcome of the promotion predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Stay,
    Promote,
}

/// Pure promotion predicate.
///
/// A bootstrap tenant is promoted when ANY of the corroboration signals
/// holds: enough admins (per-tenant threshold, default 2, counting the
/// provisional admin), at least one steward, or enough age for organic
/// growth to have been possible. One independent signal suffices; the
/// provisional admin is then no longer acting unchecked.
pub fn evaluate(tenant: &Tenant, now: DateTime<Utc>) -> Evaluation {
    if !tenant.is_bootstrap() {
        return Evaluation::Stay;
    }

    let corroborated = tenant.admin_count >= tenant.admin_threshold
        || tenant.steward_count >= 1
        || tenant.age_days(now) >= i64::from(tenant.age_days_threshold);

    if corroborated {
        Evaluation::Promote
    } else {
        Evaluation::Stay
    }
}

pub struct MaturityService {
    stores: Stores,
    locks: Arc<TenantLocks>,
    events: EventBus,
}

impl MaturityService {
    pub fn new(stores: Stores, locks: Arc<TenantLocks>, events: EventBus) -> Self {
        Self {
            stores,
            locks,
            events,
        }
    }

    /// Re-run the predicate for a tenant and promote if it passes. Takes the
    /// tenant lock; safe to call opportunistically on any read path (age
    /// crosses its threshold without an accompanying membership event).
    pub async fn reevaluate(&self, tenant_id: Uuid) -> Result<Tenant, ApiError> {
        let _guard = self.locks.acquire(tenant_id).await;
        self.reevaluate_locked(tenant_id).await
    }

    /// Predicate + promotion for callers already holding the tenant lock.
    /// The membership mutation, counter refresh, and this call form one
    /// serialized unit per tenant.
    pub(crate) async fn reevaluate_locked(&self, tenant_id: Uuid) -> Result<Tenant, ApiError> {
        let tenant = self
            .stores
            .tenants
            .by_id(tenant_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))?;

        match evaluate(&tenant, Utc::now()) {
            Evaluation::Stay => Ok(tenant),
            Evaluation::Promote => {
                let promoted = self.stores.tenants.promote(tenant_id, Utc::now()).await?;
                tracing::info!(
                    domain = %promoted.domain,
                    admin_count = promoted.admin_count,
                    steward_count = promoted.steward_count,
                    "tenant promoted to mature"
                );
                self.events
                    .publish(GovernanceEvent::TenantPromoted {
                        tenant_id: promoted.id,
                        domain: promoted.domain.clone(),
                        forced: false,
                    })
                    .await;
                Ok(promoted)
            }
        }
    }

    /// Superadmin override: promote without consulting the thresholds.
    /// Idempotent; promoting an already-mature tenant is a no-op.
    pub async fn force_promote(&self, domain: &str) -> Result<Tenant, ApiError> {
        let tenant = self.require_tenant(domain).await?;
        let _guard = self.locks.acquire(tenant.id).await;

        let was_bootstrap = {
            // Re-read under the lock; an in-flight approval may have already
            // promoted this tenant.
            self.stores
                .tenants
                .by_id(tenant.id)
                .await?
                .map(|t| t.is_bootstrap())
                .ok_or_else(|| ApiError::not_found("Tenant not found"))?
        };

        let promoted = self.stores.tenants.promote(tenant.id, Utc::now()).await?;
        if was_bootstrap {
            tracing::info!(domain = %promoted.domain, "tenant force-promoted by superadmin");
            self.events
                .publish(GovernanceEvent::TenantPromoted {
                    tenant_id: promoted.id,
                    domain: promoted.domain.clone(),
                    forced: true,
                })
                .await;
        }
        Ok(promoted)
    }

    /// Superadmin threshold update. Out-of-range values reject the whole
    /// update; nothing persists.
    pub async fn update_thresholds(
        &self,
        domain: &str,
        update: &ThresholdUpdate,
    ) -> Result<Tenant, ApiError> {
        if let Err(field_errors) = update.validate() {
            return Err(ApiError::validation_error(
                "Invalid threshold values",
                Some(field_errors),
            ));
        }

        let tenant = self.require_tenant(domain).await?;
        let _guard = self.locks.acquire(tenant.id).await;
        let tenant = self
            .stores
            .tenants
            .update_thresholds(tenant.id, update, Utc::now())
            .await?;

        // Lowered thresholds can make the predicate pass right away.
        self.reevaluate_locked(tenant.id).await
    }

    /// Directory overview for the superadmin surface. Reads re-check the
    /// age-based disjunct as a side effect.
    pub async fn overview(&self, domain: &str) -> Result<Tenant, ApiError> {
        let tenant = self.require_tenant(domain).await?;
        self.reevaluate(tenant.id).await
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, ApiError> {
        Ok(self.stores.tenants.list().await?)
    }

    async fn require_tenant(&self, domain: &str) -> Result<Tenant, ApiError> {
        self.stores
            .tenants
            .by_domain(domain)
            .await?
            .ok_or_else(|| ApiError::not_found("Tenant not found"))
    }
}
