use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::GlobalRole;

/// Roles a member may request. Plain `user` is the floor and `admin` the
/// ceiling of self-service elevation; provisional admin is never requestable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedRole {
    Steward,
    Admin,
}

impl RequestedRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedRole::Steward => "steward",
            RequestedRole::Admin => "admin",
        }
    }

    /// The membership role granted on approval.
    pub fn granted_role(&self) -> GlobalRole {
        match self {
            RequestedRole::Steward => GlobalRole::Steward,
            RequestedRole::Admin => GlobalRole::Admin,
        }
    }
}

impl fmt::Display for RequestedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestedRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "steward" => Ok(RequestedRole::Steward),
            "admin" => Ok(RequestedRole::Admin),
            other => Err(format!("requested role must be steward or admin, got: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

/// A self-service elevation request. Mutated exactly once, pending →
/// approved|rejected, then kept as an audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub requested_role: RequestedRole,
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RoleRequest {
    pub fn new(
        user_id: Uuid,
        tenant_id: Uuid,
        requested_role: RequestedRole,
        reason: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tenant_id,
            requested_role,
            reason,
            status: RequestStatus::Pending,
            created_at: now,
            resolved_by: None,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}
