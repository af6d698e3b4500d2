use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trust state of an organization. Monotonic: bootstrap tenants promote to
/// mature; nothing moves a mature tenant back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityState {
    Bootstrap,
    Mature,
}

impl MaturityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaturityState::Bootstrap => "bootstrap",
            MaturityState::Mature => "mature",
        }
    }
}

impl fmt::Display for MaturityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaturityState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bootstrap" => Ok(MaturityState::Bootstrap),
            "mature" => Ok(MaturityState::Mature),
            other => Err(format!("unknown maturity state: {}", other)),
        }
    }
}

/// How members of a tenant authenticate. The mechanics live in the identity
/// collaborator; governance only stores the selection because changing it is
/// locked for provisional admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password,
    Sso,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Password => "password",
            AuthMethod::Sso => "sso",
        }
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(AuthMethod::Password),
            "sso" => Ok(AuthMethod::Sso),
            other => Err(format!("unknown auth method: {}", other)),
        }
    }
}

/// Admin-editable tenant settings. These are the fields the server keeps
/// locked for provisional admins while the tenant is bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSettings {
    pub auth_method: AuthMethod,
    pub self_registration: bool,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            auth_method: AuthMethod::Password,
            self_registration: true,
        }
    }
}

/// An organization in the directory, keyed by its email domain.
///
/// `admin_count` and `steward_count` are cached counters derived from the
/// membership store; every membership write refreshes them in the same
/// serialized unit that re-evaluates maturity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub domain: String,
    pub maturity: MaturityState,
    pub age_days_threshold: i32,
    pub user_threshold: i32,
    pub admin_threshold: i32,
    pub admin_count: i32,
    pub steward_count: i32,
    pub settings: TenantSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// New bootstrap tenant with the supplied threshold defaults.
    pub fn provision(
        domain: impl Into<String>,
        age_days_threshold: i32,
        user_threshold: i32,
        admin_threshold: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            maturity: MaturityState::Bootstrap,
            age_days_threshold,
            user_threshold,
            admin_threshold,
            admin_count: 0,
            steward_count: 0,
            settings: TenantSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whole days since the tenant was provisioned.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn is_bootstrap(&self) -> bool {
        self.maturity == MaturityState::Bootstrap
    }
}

/// Superadmin threshold update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdUpdate {
    pub age_days_threshold: Option<i32>,
    pub user_threshold: Option<i32>,
    pub admin_threshold: Option<i32>,
}

/// Hard ceiling on the age threshold: a tenant older than a year always
/// counts as organically grown.
pub const AGE_DAYS_THRESHOLD_MAX: i32 = 365;

impl ThresholdUpdate {
    /// Validate ranges. Returns per-field violations for the API error body;
    /// nothing persists when any field is out of range.
    pub fn validate(&self) -> Result<(), HashMap<String, String>> {
        let mut field_errors = HashMap::new();

        if let Some(age) = self.age_days_threshold {
            if !(0..=AGE_DAYS_THRESHOLD_MAX).contains(&age) {
                field_errors.insert(
                    "age_days_threshold".to_string(),
                    format!("must be between 0 and {}", AGE_DAYS_THRESHOLD_MAX),
                );
            }
        }
        if let Some(users) = self.user_threshold {
            if users < 0 {
                field_errors.insert("user_threshold".to_string(), "must be >= 0".to_string());
            }
        }
        if let Some(admins) = self.admin_threshold {
            if admins < 0 {
                field_errors.insert("admin_threshold".to_string(), "must be >= 0".to_string());
            }
        }

        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(field_errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.age_days_threshold.is_none()
            && self.user_threshold.is_none()
            && self.admin_threshold.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(age: Option<i32>, users: Option<i32>, admins: Option<i32>) -> ThresholdUpdate {
        ThresholdUpdate {
            age_days_threshold: age,
            user_threshold: users,
            admin_threshold: admins,
        }
    }

    #[test]
    fn threshold_ranges_are_enforced() {
        assert!(update(Some(0), Some(0), Some(0)).validate().is_ok());
        assert!(update(Some(365), None, None).validate().is_ok());

        let err = update(Some(-10), None, None).validate().unwrap_err();
        assert!(err.contains_key("age_days_threshold"));

        let err = update(Some(366), Some(-1), Some(-1)).validate().unwrap_err();
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn age_days_counts_whole_days() {
        let now = Utc::now();
        let tenant = Tenant::provision("acme.com", 30, 0, 2, now - chrono::Duration::days(3));
        assert_eq!(tenant.age_days(now), 3);
        assert!(tenant.is_bootstrap());
    }

    #[test]
    fn maturity_state_round_trips_through_text() {
        for state in [MaturityState::Bootstrap, MaturityState::Mature] {
            assert_eq!(state.as_str().parse::<MaturityState>().unwrap(), state);
        }
        assert!("suspended".parse::<MaturityState>().is_err());
    }
}
