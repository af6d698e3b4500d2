use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    Extension,
};

use crate::domain::Principal;
use crate::error::ApiError;

/// Gate for the superadmin surface: only the master principal passes.
/// Members get the same Forbidden body as any other denied action, so the
/// response does not reveal what lives behind the gate.
pub async fn require_master(
    principal: Option<Extension<Principal>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = principal
        .map(|Extension(p)| p)
        .unwrap_or(Principal::Anonymous);

    match principal {
        Principal::Master => Ok(next.run(request).await),
        Principal::Anonymous => Err(ApiError::unauthorized("Authentication required")),
        Principal::Member(_) => Err(ApiError::forbidden("You cannot perform this action")),
    }
}
