// Role request workflow surface: submit, list, resolve.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{RequestedRole, RoleRequest};
use crate::error::ApiError;
use crate::guard::TenantAccess;
use crate::services::Resolution;
use crate::state::AppState;

fn request_json(request: &RoleRequest) -> Value {
    json!({
        "id": request.id,
        "user_id": request.user_id,
        "requested_role": request.requested_role,
        "reason": request.reason,
        "status": request.status,
        "created_at": request.created_at,
        "resolved_by": request.resolved_by,
        "resolved_at": request.resolved_at,
    })
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub requested_role: String,
    pub reason: String,
}

/// POST /:domain/requests - submit an elevation request.
///
/// The requested role arrives as text so an out-of-range value surfaces as
/// a field validation error rather than a deserialization failure.
pub async fn submit(
    State(state): State<AppState>,
    Extension(access): Extension<TenantAccess>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<Value>, ApiError> {
    let requested_role = RequestedRole::from_str(&body.requested_role).map_err(|e| {
        let mut field_errors = std::collections::HashMap::new();
        field_errors.insert("requested_role".to_string(), e);
        ApiError::validation_error("Invalid role request", Some(field_errors))
    })?;

    let request = state
        .services
        .role_requests
        .submit(
            &access.tenant,
            access.membership.user_id,
            requested_role,
            &body.reason,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": request_json(&request),
    })))
}

/// GET /:domain/requests - pending requests for the caller's tenant.
/// Admins and stewards only; scope never crosses tenants.
pub async fn list(
    State(state): State<AppState>,
    Extension(access): Extension<TenantAccess>,
) -> Result<Json<Value>, ApiError> {
    let requests = state
        .services
        .role_requests
        .list_pending(&access.tenant, access.membership.user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": requests.iter().map(request_json).collect::<Vec<_>>(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub outcome: Resolution,
}

#[derive(Debug, Deserialize)]
pub struct ResolvePath {
    pub domain: String,
    pub id: Uuid,
}

/// POST /:domain/requests/:id/resolve - approve or reject a pending
/// request. Approval can cascade into a maturity promotion; the response
/// carries the tenant state after the whole unit committed.
pub async fn resolve(
    State(state): State<AppState>,
    Path(path): Path<ResolvePath>,
    Extension(access): Extension<TenantAccess>,
    Json(body): Json<ResolveRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .services
        .role_requests
        .resolve(
            &access.tenant,
            access.membership.user_id,
            path.id,
            body.outcome,
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "request": request_json(&outcome.request),
            "membership": outcome.membership.as_ref().map(|m| json!({
                "user_id": m.user_id,
                "role": m.role,
            })),
            "tenant": {
                "domain": outcome.tenant.domain,
                "maturity": outcome.tenant.maturity,
            },
        }
    })))
}
