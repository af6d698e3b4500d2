// Superadmin surface. Everything here sits behind the master gate; the
// guard pipeline keeps the same master account away from tenant data.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{DomainApprovalStatus, Tenant, ThresholdUpdate};
use crate::error::ApiError;
use crate::state::AppState;

fn tenant_json(tenant: &Tenant) -> Value {
    json!({
        "id": tenant.id,
        "domain": tenant.domain,
        "maturity": tenant.maturity,
        "thresholds": {
            "age_days_threshold": tenant.age_days_threshold,
            "user_threshold": tenant.user_threshold,
            "admin_threshold": tenant.admin_threshold,
        },
        "counters": {
            "admin_count": tenant.admin_count,
            "steward_count": tenant.steward_count,
        },
        "age_days": tenant.age_days(chrono::Utc::now()),
        "created_at": tenant.created_at,
    })
}

/// GET /admin - the superadmin dashboard surface the guard redirects the
/// master account to.
pub async fn dashboard() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Quorum superadmin dashboard",
            "endpoints": {
                "tenants": "/admin/tenants",
                "tenant": "/admin/tenants/:domain",
                "promote": "/admin/tenants/:domain/promote",
                "thresholds": "/admin/tenants/:domain/thresholds",
                "approval": "/admin/domains/:domain/approval",
            }
        }
    }))
}

/// GET /admin/tenants - directory listing.
pub async fn tenants_list(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tenants = state.services.maturity.list().await?;

    Ok(Json(json!({
        "success": true,
        "data": tenants.iter().map(tenant_json).collect::<Vec<_>>(),
    })))
}

/// GET /admin/tenants/:domain - maturity and threshold overview. The read
/// re-runs the evaluator so an age-qualified tenant promotes without
/// waiting for a membership event.
pub async fn tenant_get(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let tenant = state.services.maturity.overview(&domain).await?;

    Ok(Json(json!({
        "success": true,
        "data": tenant_json(&tenant),
    })))
}

/// POST /admin/tenants/:domain/promote - forced promotion, bypassing the
/// thresholds. Idempotent: promoting a mature tenant is a no-op.
pub async fn tenant_promote(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let tenant = state.services.maturity.force_promote(&domain).await?;

    Ok(Json(json!({
        "success": true,
        "data": tenant_json(&tenant),
    })))
}

/// PUT /admin/tenants/:domain/thresholds - per-tenant threshold update.
/// Out-of-range values reject the whole request with field errors.
pub async fn thresholds_put(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Json(update): Json<ThresholdUpdate>,
) -> Result<Json<Value>, ApiError> {
    let tenant = state
        .services
        .maturity
        .update_thresholds(&domain, &update)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": tenant_json(&tenant),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ApprovalUpdate {
    pub status: String,
}

/// PUT /admin/domains/:domain/approval - move a domain through the
/// provisioning ledger.
pub async fn domain_approval_put(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Json(body): Json<ApprovalUpdate>,
) -> Result<Json<Value>, ApiError> {
    let status = DomainApprovalStatus::from_str(&body.status)
        .ok()
        .filter(|s| *s != DomainApprovalStatus::Unknown)
        .ok_or_else(|| {
            let mut field_errors = std::collections::HashMap::new();
            field_errors.insert(
                "status".to_string(),
                "must be pending, approved, or rejected".to_string(),
            );
            ApiError::validation_error("Invalid approval status", Some(field_errors))
        })?;

    state
        .stores
        .approvals
        .set_status(&domain, status, chrono::Utc::now())
        .await?;

    tracing::info!(domain = %domain, status = status.as_str(), "domain approval updated");

    Ok(Json(json!({
        "success": true,
        "data": {
            "domain": domain,
            "status": status,
        }
    })))
}
