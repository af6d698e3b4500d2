// Role request workflow: mediated, auditable self-service elevation.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{
    Membership, RequestStatus, RequestedRole, RoleRequest, Tenant,
};
use crate::error::ApiError;
use crate::events::{EventBus, GovernanceEvent};
use crate::store::{StoreError, Stores};

use super::locks::TenantLocks;
use super::maturity::MaturityService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Approve,
    Reject,
}

/// Result of resolving a request. `membership` is the requester's updated
/// membership on approval; `tenant` reflects any promotion the approval
/// cascaded into.
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub request: RoleRequest,
    pub membership: Option<Membership>,
    pub tenant: Tenant,
}

pub struct RoleRequestService {
    stores: Stores,
    locks: Arc<TenantLocks>,
    events: EventBus,
    maturity: Arc<MaturityService>,
}

impl RoleRequestService {
    pub fn new(
        stores: Stores,
        locks: Arc<TenantLocks>,
        events: EventBus,
        maturity: Arc<MaturityService>,
    ) -> Self {
        Self {
            stores,
            locks,
            events,
            maturity,
        }
    }

    /// Submit an elevation request for the calling member.
    ///
    /// Only plain `user` memberships may file one; elevated members already
    /// hold or exceed the requestable roles.
    pub async fn submit(
        &self,
        tenant: &Tenant,
        user_id: Uuid,
        requested_role: RequestedRole,
        reason: &str,
    ) -> Result<RoleRequest, ApiError> {
        let reason = reason.trim();
        if reason.is_empty() {
            let mut field_errors = std::collections::HashMap::new();
            field_errors.insert("reason".to_string(), "must not be empty".to_string());
            return Err(ApiError::validation_error(
                "A reason is required",
                Some(field_errors),
            ));
        }

        let _guard = self.locks.acquire(tenant.id).await;

        let membership = self
            .stores
            .memberships
            .find(user_id, tenant.id)
            .await?
            .ok_or_else(|| ApiError::forbidden("You cannot perform this action"))?;
        if membership.role.is_elevated() {
            return Err(ApiError::forbidden("You cannot perform this action"));
        }

        let request = RoleRequest::new(
            user_id,
            tenant.id,
            requested_role,
            reason.to_string(),
            Utc::now(),
        );
        let request = match self.stores.role_requests.create(request).await {
            Ok(request) => request,
            Err(StoreError::Duplicate(_)) => {
                return Err(ApiError::conflict(
                    "A role request is already pending for this account",
                ))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            domain = %tenant.domain,
            requested_role = %requested_role,
            "role request submitted"
        );
        self.events
            .publish(GovernanceEvent::RoleRequestSubmitted {
                request_id: request.id,
                tenant_id: tenant.id,
                domain: tenant.domain.clone(),
                user_id,
                requested_role,
            })
            .await;

        Ok(request)
    }

    /// Approve or reject a pending request.
    ///
    /// A request that does not exist, is already resolved, or belongs to a
    /// different tenant is uniformly `NotFound`; callers cannot distinguish
    /// the cases. Approval updates the requester's membership and re-runs
    /// the maturity predicate in the same serialized unit, since the new
    /// counter can itself complete the corroboration.
    pub async fn resolve(
        &self,
        tenant: &Tenant,
        resolver_id: Uuid,
        request_id: Uuid,
        resolution: Resolution,
    ) -> Result<ResolutionOutcome, ApiError> {
        let _guard = self.locks.acquire(tenant.id).await;

        let resolver = self
            .stores
            .memberships
            .find(resolver_id, tenant.id)
            .await?
            .ok_or_else(|| ApiError::forbidden("You cannot perform this action"))?;
        if !resolver.role.can_resolve_requests() {
            return Err(ApiError::forbidden("You cannot perform this action"));
        }

        let request = self
            .stores
            .role_requests
            .by_id(request_id)
            .await?
            .filter(|r| r.tenant_id == tenant.id && r.is_pending())
            .ok_or_else(|| ApiError::not_found("Role request not found"))?;

        let outcome = match resolution {
            Resolution::Reject => {
                let request = self
                    .stores
                    .role_requests
                    .resolve(request.id, RequestStatus::Rejected, resolver_id, Utc::now())
                    .await?;
                ResolutionOutcome {
                    request,
                    membership: None,
                    tenant: tenant.clone(),
                }
            }
            Resolution::Approve => {
                let request = self
                    .stores
                    .role_requests
                    .resolve(request.id, RequestStatus::Approved, resolver_id, Utc::now())
                    .await?;
                let membership = self
                    .stores
                    .memberships
                    .set_role(
                        request.user_id,
                        tenant.id,
                        request.requested_role.granted_role(),
                        Utc::now(),
                    )
                    .await?;

                self.events
                    .publish(GovernanceEvent::MembershipChanged {
                        tenant_id: tenant.id,
                        domain: tenant.domain.clone(),
                        user_id: membership.user_id,
                        role: membership.role,
                    })
                    .await;

                // Counter changed: evaluate while still holding the lock.
                let tenant = self.maturity.reevaluate_locked(tenant.id).await?;
                ResolutionOutcome {
                    request,
                    membership: Some(membership),
                    tenant,
                }
            }
        };

        tracing::info!(
            domain = %tenant.domain,
            request = %outcome.request.id,
            status = outcome.request.status.as_str(),
            "role request resolved"
        );
        self.events
            .publish(GovernanceEvent::RoleRequestResolved {
                request_id: outcome.request.id,
                tenant_id: tenant.id,
                domain: tenant.domain.clone(),
                user_id: outcome.request.user_id,
                outcome: outcome.request.status,
                resolved_by: resolver_id,
            })
            .await;

        Ok(outcome)
    }

    /// Pending requests for the viewer's tenant. Visible to admins and
    /// stewards only, and never across tenants.
    pub async fn list_pending(
        &self,
        tenant: &Tenant,
        viewer_id: Uuid,
    ) -> Result<Vec<RoleRequest>, ApiError> {
        let viewer = self
            .stores
            .memberships
            .find(viewer_id, tenant.id)
            .await?
            .ok_or_else(|| ApiError::forbidden("You cannot perform this action"))?;
        if !viewer.role.can_resolve_requests() {
            return Err(ApiError::forbidden("You cannot perform this action"));
        }

        Ok(self.stores.role_requests.list_pending(tenant.id).await?)
    }
}
