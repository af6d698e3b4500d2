// Finer-grained restriction inside admin surfaces: a provisional admin of a
// bootstrap tenant cannot change the security-sensitive settings until the
// tenant matures. The UI shows a banner and per-field locks; this module is
// the server-side enforcement behind them.

use crate::domain::{GlobalRole, Tenant};
use crate::error::ApiError;

/// Settings that stay read-only for a provisional admin.
pub const LOCKED_FIELDS: &[&str] = &["auth_method", "self_registration"];

/// Fields currently locked for this role on this tenant.
pub fn locked_fields(tenant: &Tenant, role: GlobalRole) -> &'static [&'static str] {
    if tenant.is_bootstrap() && role == GlobalRole::ProvisionalAdmin {
        LOCKED_FIELDS
    } else {
        &[]
    }
}

/// Reject a write touching a locked field.
pub fn ensure_unlocked(
    tenant: &Tenant,
    role: GlobalRole,
    touched: &[&str],
) -> Result<(), ApiError> {
    let locked = locked_fields(tenant, role);
    let blocked: Vec<&str> = touched
        .iter()
        .copied()
        .filter(|field| locked.contains(field))
        .collect();

    if blocked.is_empty() {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "These settings are locked until the organization matures: {}",
            blocked.join(", ")
        )))
    }
}
