// Authorization guard layer: the single choke point in front of every
// tenant-scoped operation.
//
// The pipeline runs the checks of `checks` in a fixed order; the first
// failing check short-circuits with a redirect decision. Ordering is
// security-critical: master isolation must precede the membership match,
// and the role gate only runs for callers already confirmed to belong to
// the tenant.

pub mod checks;
pub mod settings_lock;

use serde::Serialize;

use crate::domain::{DomainApprovalStatus, Membership, Principal, Tenant};
use crate::error::ApiError;
use crate::store::Stores;

pub use checks::CheckOutcome;

/// Role class a route demands. `Member` is any confirmed membership;
/// `Admin` additionally requires the admin gate (provisional admins pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredRole {
    Member,
    Admin,
}

/// Terminal decision of a failing check: where to send the caller.
/// Denials are redirects, not hard errors; a pending domain is "not yet
/// allowed", not "broken".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Unauthenticated: the tenant's login surface.
    Login { domain: String },
    /// Master account: back to the superadmin dashboard.
    MasterDashboard,
    /// Wrong tenant: the caller's own tenant's equivalent resource.
    HomeTenant { domain: String },
    /// Domain not (yet) approved: the status surface.
    ApprovalStatus {
        domain: String,
        status: DomainApprovalStatus,
    },
    /// Insufficient role: the tenant home.
    TenantHome { domain: String },
}

impl RedirectTarget {
    pub fn path(&self) -> String {
        match self {
            RedirectTarget::Login { domain } => format!("/{}/login", domain),
            RedirectTarget::MasterDashboard => "/admin".to_string(),
            RedirectTarget::HomeTenant { domain } => format!("/{}", domain),
            RedirectTarget::ApprovalStatus { domain, status } => {
                format!("/{}/status/{}", domain, status)
            }
            RedirectTarget::TenantHome { domain } => format!("/{}", domain),
        }
    }

    /// Stable name for logs and the authorize endpoint.
    pub fn reason(&self) -> &'static str {
        match self {
            RedirectTarget::Login { .. } => "unauthenticated",
            RedirectTarget::MasterDashboard => "master_isolation",
            RedirectTarget::HomeTenant { .. } => "wrong_tenant",
            RedirectTarget::ApprovalStatus { .. } => "domain_not_approved",
            RedirectTarget::TenantHome { .. } => "insufficient_role",
        }
    }
}

/// Confirmed access, injected into the request for the handlers: the target
/// tenant and the caller's membership in it, both freshly read.
#[derive(Debug, Clone)]
pub struct TenantAccess {
    pub tenant: Tenant,
    pub membership: Membership,
}

#[derive(Debug)]
pub enum GuardVerdict {
    Allow(TenantAccess),
    Deny(RedirectTarget),
}

pub struct GuardPipeline {
    stores: Stores,
}

impl GuardPipeline {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Run the ordered checks for `principal` addressing tenant `domain`.
    ///
    /// Errors are reserved for the fail-closed cases (directory unreachable,
    /// tenant deleted mid-flight); every policy denial is a `Deny` verdict.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        domain: &str,
        required: RequiredRole,
    ) -> Result<GuardVerdict, ApiError> {
        // 1. Authentication
        if let CheckOutcome::Deny(target) = checks::authentication(principal, domain) {
            tracing::debug!(domain, reason = target.reason(), "guard denied");
            return Ok(GuardVerdict::Deny(target));
        }

        // 2. Master-account isolation
        if let CheckOutcome::Deny(target) = checks::master_isolation(principal) {
            tracing::warn!(domain, "master account denied tenant-scoped access");
            return Ok(GuardVerdict::Deny(target));
        }

        let member = match principal.as_member() {
            Some(member) => member,
            // Checks 1 and 2 leave only members; anything else counts as
            // unauthenticated.
            None => {
                return Ok(GuardVerdict::Deny(RedirectTarget::Login {
                    domain: domain.to_string(),
                }))
            }
        };

        // 3. Tenant membership match
        if let CheckOutcome::Deny(target) = checks::membership_match(member, domain) {
            tracing::debug!(
                domain,
                home = %member.domain,
                reason = target.reason(),
                "guard denied"
            );
            return Ok(GuardVerdict::Deny(target));
        }

        // Directory resolution fails closed: a tenant deleted mid-flight is
        // NotFound, never a partial success.
        let tenant = self
            .stores
            .tenants
            .by_domain(domain)
            .await?
            .ok_or_else(|| ApiError::not_found("Not found"))?;

        // 4. Domain approval status (fail open on lookup failure)
        if let CheckOutcome::Deny(target) =
            checks::domain_approval(self.stores.approvals.as_ref(), &tenant).await
        {
            return Ok(GuardVerdict::Deny(target));
        }

        // The claims only prove identity; the role is read back from the
        // membership store. A member whose record vanished re-authenticates.
        let membership = match self
            .stores
            .memberships
            .find(member.user_id, tenant.id)
            .await?
        {
            Some(membership) => membership,
            None => {
                tracing::warn!(domain, user = %member.user_id, "member without membership record");
                return Ok(GuardVerdict::Deny(RedirectTarget::Login {
                    domain: domain.to_string(),
                }));
            }
        };

        // 5. Role gate
        if let CheckOutcome::Deny(target) = checks::role_gate(&membership, required, domain) {
            tracing::debug!(domain, role = %membership.role, "guard denied: role gate");
            return Ok(GuardVerdict::Deny(target));
        }

        Ok(GuardVerdict::Allow(TenantAccess { tenant, membership }))
    }
}
