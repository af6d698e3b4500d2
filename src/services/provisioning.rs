// Tenant lifecycle entry point: the first user from a new email domain
// creates the tenant; everyone after joins it.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::config::GovernanceConfig;
use crate::domain::{
    DomainApprovalStatus, GlobalRole, Membership, Tenant,
};
use crate::error::ApiError;
use crate::events::{EventBus, GovernanceEvent};
use crate::store::{StoreError, Stores};

use super::locks::TenantLocks;
use super::maturity::MaturityService;

#[derive(Debug)]
pub struct SignupOutcome {
    pub tenant: Tenant,
    pub membership: Membership,
    pub token: String,
}

pub struct ProvisioningService {
    stores: Stores,
    locks: Arc<TenantLocks>,
    events: EventBus,
    maturity: Arc<MaturityService>,
    defaults: GovernanceConfig,
}

impl ProvisioningService {
    pub fn new(
        stores: Stores,
        locks: Arc<TenantLocks>,
        events: EventBus,
        maturity: Arc<MaturityService>,
        defaults: GovernanceConfig,
    ) -> Self {
        Self {
            stores,
            locks,
            events,
            maturity,
            defaults,
        }
    }

    /// Sign a user up by email. First user of a new domain founds the tenant
    /// in bootstrap state and becomes its provisional admin; later users
    /// join as plain members.
    pub async fn sign_up(&self, email: &str, name: &str) -> Result<SignupOutcome, ApiError> {
        let domain = extract_domain(email)?;

        // A rejected domain may not be provisioned or joined. The message is
        // the same whether or not a tenant exists behind it.
        let approval = self.stores.approvals.status(&domain).await?;
        if approval == DomainApprovalStatus::Rejected {
            return Err(ApiError::forbidden(
                "This organization domain is not eligible",
            ));
        }

        let user_id = Uuid::new_v4();
        let (tenant, membership) = match self.stores.tenants.by_domain(&domain).await? {
            Some(tenant) => self.join(tenant, user_id).await?,
            None => match self.found(&domain, approval, user_id).await {
                Ok(result) => result,
                // Concurrent signup founded the tenant first; join it.
                Err(ApiError::Conflict(_)) => {
                    let tenant = self
                        .stores
                        .tenants
                        .by_domain(&domain)
                        .await?
                        .ok_or_else(|| {
                            ApiError::internal_server_error("Tenant registry inconsistent")
                        })?;
                    self.join(tenant, user_id).await?
                }
                Err(e) => return Err(e),
            },
        };

        self.events
            .publish(GovernanceEvent::MembershipChanged {
                tenant_id: tenant.id,
                domain: tenant.domain.clone(),
                user_id,
                role: membership.role,
            })
            .await;

        let token = auth::generate_jwt(&Claims::member(
            user_id,
            name.to_string(),
            tenant.domain.clone(),
        ))
        .map_err(|e| {
            tracing::error!("token generation failed: {}", e);
            ApiError::internal_server_error("Could not issue a session token")
        })?;

        Ok(SignupOutcome {
            tenant,
            membership,
            token,
        })
    }

    async fn found(
        &self,
        domain: &str,
        approval: DomainApprovalStatus,
        user_id: Uuid,
    ) -> Result<(Tenant, Membership), ApiError> {
        let now = Utc::now();

        // New domains enter the ledger as pending; a legacy record stays as
        // it is.
        if approval == DomainApprovalStatus::Unknown {
            self.stores
                .approvals
                .set_status(domain, DomainApprovalStatus::Pending, now)
                .await?;
        }

        let tenant = Tenant::provision(
            domain,
            self.defaults.default_age_days_threshold,
            self.defaults.default_user_threshold,
            self.defaults.default_admin_threshold,
            now,
        );
        let tenant = self.stores.tenants.create(tenant).await.map_err(|e| match e {
            StoreError::Duplicate(_) => ApiError::conflict("Tenant already exists"),
            other => other.into(),
        })?;

        let _guard = self.locks.acquire(tenant.id).await;
        let membership = self
            .stores
            .memberships
            .insert(Membership::new(
                user_id,
                tenant.id,
                GlobalRole::ProvisionalAdmin,
                now,
            ))
            .await?;
        let tenant = self.maturity.reevaluate_locked(tenant.id).await?;

        tracing::info!(domain = %tenant.domain, "tenant provisioned in bootstrap state");
        Ok((tenant, membership))
    }

    async fn join(&self, tenant: Tenant, user_id: Uuid) -> Result<(Tenant, Membership), ApiError> {
        let _guard = self.locks.acquire(tenant.id).await;

        let membership = self
            .stores
            .memberships
            .insert(Membership::new(user_id, tenant.id, GlobalRole::User, Utc::now()))
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    ApiError::conflict("This account is already a member of the organization")
                }
                other => other.into(),
            })?;

        // Reads and joins double as the opportunistic age check.
        let tenant = self.maturity.reevaluate_locked(tenant.id).await?;
        Ok((tenant, membership))
    }
}

/// Lowercased domain part of a signup email.
fn extract_domain(email: &str) -> Result<String, ApiError> {
    let invalid = || {
        let mut field_errors = std::collections::HashMap::new();
        field_errors.insert("email".to_string(), "must be a valid email address".to_string());
        ApiError::validation_error("Invalid email address", Some(field_errors))
    };

    let (local, domain) = email.trim().rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(invalid());
    }
    let domain = domain.to_ascii_lowercase();
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid());
    }
    Ok(domain)
}
