use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provisioning gate for an organization domain.
///
/// `Unknown` marks legacy tenants that predate the ledger; the guard treats
/// them permissively so existing organizations keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Unknown,
}

impl DomainApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainApprovalStatus::Pending => "pending",
            DomainApprovalStatus::Approved => "approved",
            DomainApprovalStatus::Rejected => "rejected",
            DomainApprovalStatus::Unknown => "unknown",
        }
    }

    /// Whether a tenant on this domain may be served at all.
    pub fn permits_access(&self) -> bool {
        matches!(self, DomainApprovalStatus::Approved | DomainApprovalStatus::Unknown)
    }
}

impl fmt::Display for DomainApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DomainApprovalStatus::Pending),
            "approved" => Ok(DomainApprovalStatus::Approved),
            "rejected" => Ok(DomainApprovalStatus::Rejected),
            "unknown" => Ok(DomainApprovalStatus::Unknown),
            other => Err(format!("unknown approval status: {}", other)),
        }
    }
}
