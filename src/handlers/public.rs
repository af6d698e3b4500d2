// Public surface: service descriptor, liveness, and signup provisioning.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Quorum Governance API",
            "version": version,
            "description": "Tenant governance and maturity lifecycle service",
            "endpoints": {
                "home": "/ (public)",
                "signup": "/signup (public)",
                "tenant": "/:domain/* (tenant-scoped, guarded)",
                "admin": "/admin/* (superadmin only)",
            }
        }
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
}

/// POST /signup - join or found the tenant for the email's domain.
///
/// The first user of a new domain founds the tenant (bootstrap state,
/// provisional admin); later users join as members.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .services
        .provisioning
        .sign_up(&body.email, &body.name)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "tenant": {
                "domain": outcome.tenant.domain,
                "maturity": outcome.tenant.maturity,
            },
            "membership": {
                "user_id": outcome.membership.user_id,
                "role": outcome.membership.role,
            },
            "token": outcome.token,
        }
    })))
}
