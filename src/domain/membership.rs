use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-tenant role of a member.
///
/// `ProvisionalAdmin` is the founding admin of a bootstrap tenant: full admin
/// capabilities minus the locked settings, rewritten to `Admin` the moment
/// the tenant matures. It never exists inside a mature tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    User,
    Steward,
    Admin,
    ProvisionalAdmin,
}

impl GlobalRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalRole::User => "user",
            GlobalRole::Steward => "steward",
            GlobalRole::Admin => "admin",
            GlobalRole::ProvisionalAdmin => "provisional_admin",
        }
    }

    /// Anything above plain membership. Elevated members cannot file role
    /// requests; they already hold or exceed the requestable roles.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, GlobalRole::User)
    }

    /// Counts as `admin` for role-gated resources. Provisional admins pass
    /// the gate; the finer settings lock is applied separately.
    pub fn grants_admin(&self) -> bool {
        matches!(self, GlobalRole::Admin | GlobalRole::ProvisionalAdmin)
    }

    /// May approve or reject role requests for the tenant.
    pub fn can_resolve_requests(&self) -> bool {
        matches!(
            self,
            GlobalRole::Admin | GlobalRole::ProvisionalAdmin | GlobalRole::Steward
        )
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(GlobalRole::User),
            "steward" => Ok(GlobalRole::Steward),
            "admin" => Ok(GlobalRole::Admin),
            "provisional_admin" => Ok(GlobalRole::ProvisionalAdmin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A user's membership in a tenant. `(user_id, tenant_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: GlobalRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: GlobalRole, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisional_admin_passes_the_admin_gate() {
        assert!(GlobalRole::Admin.grants_admin());
        assert!(GlobalRole::ProvisionalAdmin.grants_admin());
        assert!(!GlobalRole::Steward.grants_admin());
        assert!(!GlobalRole::User.grants_admin());
    }

    #[test]
    fn stewards_resolve_requests_but_users_do_not() {
        assert!(GlobalRole::Steward.can_resolve_requests());
        assert!(GlobalRole::ProvisionalAdmin.can_resolve_requests());
        assert!(!GlobalRole::User.can_resolve_requests());
    }
}
