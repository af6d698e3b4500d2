// Tenant-scoped surface. Every route here sits behind the guard pipeline;
// handlers receive the confirmed TenantAccess from the middleware.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{AuthMethod, Principal, TenantSettings};
use crate::error::ApiError;
use crate::guard::{settings_lock, GuardVerdict, RequiredRole, TenantAccess};
use crate::state::AppState;

/// GET /:domain/decisions - the decision-record index context.
///
/// The records themselves live in the decision collaborator; this returns
/// the tenant envelope the UI renders them in. Reads double as the
/// opportunistic age-based maturity check.
pub async fn decisions_index(
    State(state): State<AppState>,
    Extension(access): Extension<TenantAccess>,
) -> Result<Json<Value>, ApiError> {
    let tenant = state.services.maturity.reevaluate(access.tenant.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "tenant": {
                "domain": tenant.domain,
                "maturity": tenant.maturity,
            },
            "member": {
                "user_id": access.membership.user_id,
                "role": access.membership.role,
            },
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub role: Option<RequiredRole>,
}

/// GET /:domain/authorize?role=member|admin - the reusable authorization
/// check. Answers the guard verdict as JSON instead of redirecting, for
/// collaborator routes that gate themselves.
pub async fn authorize(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(query): Query<AuthorizeQuery>,
    principal: Option<Extension<Principal>>,
) -> Result<Json<Value>, ApiError> {
    let principal = principal
        .map(|Extension(p)| p)
        .unwrap_or(Principal::Anonymous);
    let required = query.role.unwrap_or(RequiredRole::Member);

    let verdict = state.guard.evaluate(&principal, &domain, required).await?;
    let data = match verdict {
        GuardVerdict::Allow(access) => json!({
            "allowed": true,
            "role": access.membership.role,
        }),
        GuardVerdict::Deny(target) => json!({
            "allowed": false,
            "reason": target.reason(),
            "redirect": target.path(),
        }),
    };

    Ok(Json(json!({ "success": true, "data": data })))
}

/// GET /:domain/settings - admin-gated. Reports which fields are locked for
/// the caller so the UI can render the restriction banner and per-field
/// lock indicators.
pub async fn settings_get(
    Extension(access): Extension<TenantAccess>,
) -> Result<Json<Value>, ApiError> {
    let locked = settings_lock::locked_fields(&access.tenant, access.membership.role);

    Ok(Json(json!({
        "success": true,
        "data": {
            "settings": access.tenant.settings,
            "locked_fields": locked,
            "restricted": !locked.is_empty(),
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    pub auth_method: Option<String>,
    pub self_registration: Option<bool>,
}

/// PUT /:domain/settings - admin-gated; locked fields stay read-only for
/// provisional admins until the tenant matures, enforced here and not just
/// in the UI.
pub async fn settings_put(
    State(state): State<AppState>,
    Extension(access): Extension<TenantAccess>,
    Json(body): Json<SettingsUpdate>,
) -> Result<Json<Value>, ApiError> {
    let mut touched: Vec<&str> = Vec::new();
    if body.auth_method.is_some() {
        touched.push("auth_method");
    }
    if body.self_registration.is_some() {
        touched.push("self_registration");
    }

    settings_lock::ensure_unlocked(&access.tenant, access.membership.role, &touched)?;

    let auth_method = match &body.auth_method {
        Some(raw) => Some(AuthMethod::from_str(raw).map_err(|e| {
            let mut field_errors = std::collections::HashMap::new();
            field_errors.insert("auth_method".to_string(), e);
            ApiError::validation_error("Invalid settings", Some(field_errors))
        })?),
        None => None,
    };

    let settings = TenantSettings {
        auth_method: auth_method.unwrap_or(access.tenant.settings.auth_method),
        self_registration: body
            .self_registration
            .unwrap_or(access.tenant.settings.self_registration),
    };

    let tenant = state
        .stores
        .tenants
        .update_settings(access.tenant.id, settings, chrono::Utc::now())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "settings": tenant.settings,
        }
    })))
}
