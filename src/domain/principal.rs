use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity attached to a tenant-member bearer token. The authoritative role
/// is always re-read from the membership store; claims only carry identity
/// and the home domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPrincipal {
    pub user_id: Uuid,
    pub name: String,
    /// Email domain of the member's home tenant.
    pub domain: String,
}

/// The caller of a request, as a closed union.
///
/// The master account is its own variant rather than a flagged member, so a
/// tenant-scoped code path cannot accept it by accident: anything that wants
/// a member must destructure `Principal::Member` and the master never fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// No (valid) credentials presented.
    Anonymous,
    /// The operator-level master account. Manages tenants through the
    /// superadmin surface only; the guard denies it all tenant data.
    Master,
    Member(MemberPrincipal),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn is_master(&self) -> bool {
        matches!(self, Principal::Master)
    }

    pub fn as_member(&self) -> Option<&MemberPrincipal> {
        match self {
            Principal::Member(member) => Some(member),
            _ => None,
        }
    }
}
