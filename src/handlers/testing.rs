// Fixture endpoints for the surrounding system's non-production test
// suites. Mounted only when governance.enable_test_endpoints is set; the
// production router never includes them.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::domain::{
    DomainApprovalStatus, GlobalRole, MaturityState, Membership, Tenant,
};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    pub domain: String,
    pub name: String,
    pub role: String,
    /// Optional ledger entry to set alongside the user.
    pub approval_status: Option<String>,
}

/// POST /testing/seed - create a user with a given role in a given domain,
/// provisioning the tenant if needed, and return a bearer token for it.
pub async fn seed(
    State(state): State<AppState>,
    Json(body): Json<SeedRequest>,
) -> Result<Json<Value>, ApiError> {
    let role = GlobalRole::from_str(&body.role)
        .map_err(|e| ApiError::validation_error(e, None))?;

    let now = Utc::now();
    let defaults = &crate::config::config().governance;

    if let Some(raw) = &body.approval_status {
        let status = DomainApprovalStatus::from_str(raw)
            .map_err(|e| ApiError::validation_error(e, None))?;
        state
            .stores
            .approvals
            .set_status(&body.domain, status, now)
            .await?;
    }

    let tenant = match state.stores.tenants.by_domain(&body.domain).await? {
        Some(tenant) => tenant,
        None => {
            state
                .stores
                .tenants
                .create(Tenant::provision(
                    body.domain.clone(),
                    defaults.default_age_days_threshold,
                    defaults.default_user_threshold,
                    defaults.default_admin_threshold,
                    now,
                ))
                .await?
        }
    };

    let user_id = Uuid::new_v4();
    let membership = state
        .stores
        .memberships
        .insert(Membership::new(user_id, tenant.id, role, now))
        .await?;

    let token = auth::generate_jwt(&Claims::member(
        user_id,
        body.name.clone(),
        tenant.domain.clone(),
    ))
    .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "user_id": user_id,
            "role": membership.role,
            "tenant": {
                "id": tenant.id,
                "domain": tenant.domain,
            },
            "token": token,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct MaturityOverride {
    pub maturity: String,
}

/// PUT /testing/tenants/:domain/maturity - set maturity directly, skipping
/// the evaluator. Fixtures only; production promotion goes through the
/// evaluator or the superadmin force-promote.
pub async fn set_maturity(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Json(body): Json<MaturityOverride>,
) -> Result<Json<Value>, ApiError> {
    let maturity = MaturityState::from_str(&body.maturity)
        .map_err(|e| ApiError::validation_error(e, None))?;

    let tenant = state
        .stores
        .tenants
        .by_domain(&domain)
        .await?
        .ok_or_else(|| ApiError::not_found("Tenant not found"))?;
    let tenant = state
        .stores
        .tenants
        .set_maturity(tenant.id, maturity, Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "domain": tenant.domain,
            "maturity": tenant.maturity,
        }
    })))
}
