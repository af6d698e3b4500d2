use axum::{
    extract::{RawPathParams, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};

use crate::domain::Principal;
use crate::error::ApiError;
use crate::guard::{GuardVerdict, RequiredRole};
use crate::state::AppState;

/// Guard for member-level tenant routes.
pub async fn member_guard(
    State(state): State<AppState>,
    params: RawPathParams,
    principal: Option<Extension<Principal>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    run_guard(RequiredRole::Member, state, params, principal, request, next).await
}

/// Guard for admin-gated tenant routes (provisional admins pass).
pub async fn admin_guard(
    State(state): State<AppState>,
    params: RawPathParams,
    principal: Option<Extension<Principal>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    run_guard(RequiredRole::Admin, state, params, principal, request, next).await
}

/// Evaluate the guard pipeline for the `:domain` path parameter and either
/// inject the confirmed `TenantAccess` or answer with the redirect the
/// failing check decided on.
async fn run_guard(
    required: RequiredRole,
    state: AppState,
    params: RawPathParams,
    principal: Option<Extension<Principal>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let domain = params
        .iter()
        .find(|(key, _)| *key == "domain")
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| {
            ApiError::internal_server_error("guarded route is missing the :domain parameter")
        })?;

    let principal = principal
        .map(|Extension(p)| p)
        .unwrap_or(Principal::Anonymous);

    match state.guard.evaluate(&principal, &domain, required).await? {
        GuardVerdict::Allow(access) => {
            request.extensions_mut().insert(access);
            Ok(next.run(request).await)
        }
        GuardVerdict::Deny(target) => Ok(Redirect::to(&target.path()).into_response()),
    }
}
