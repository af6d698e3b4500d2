use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub governance: GovernanceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Absent means the in-memory registry backs the service (development).
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

/// Defaults applied to newly provisioned tenants, plus the switch for the
/// non-production seeding endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    pub default_age_days_threshold: i32,
    pub default_user_threshold: i32,
    pub default_admin_threshold: i32,
    pub enable_test_endpoints: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("GOVERNANCE_DEFAULT_AGE_DAYS_THRESHOLD") {
            self.governance.default_age_days_threshold =
                v.parse().unwrap_or(self.governance.default_age_days_threshold);
        }
        if let Ok(v) = env::var("GOVERNANCE_DEFAULT_USER_THRESHOLD") {
            self.governance.default_user_threshold =
                v.parse().unwrap_or(self.governance.default_user_threshold);
        }
        if let Ok(v) = env::var("GOVERNANCE_DEFAULT_ADMIN_THRESHOLD") {
            self.governance.default_admin_threshold =
                v.parse().unwrap_or(self.governance.default_admin_threshold);
        }
        if let Ok(v) = env::var("GOVERNANCE_ENABLE_TEST_ENDPOINTS") {
            self.governance.enable_test_endpoints =
                v.parse().unwrap_or(self.governance.enable_test_endpoints);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
            },
            security: SecurityConfig {
                jwt_secret: "dev-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            governance: GovernanceConfig {
                default_age_days_threshold: 30,
                default_user_threshold: 0,
                default_admin_threshold: 2,
                enable_test_endpoints: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            governance: GovernanceConfig {
                default_age_days_threshold: 30,
                default_user_threshold: 0,
                default_admin_threshold: 2,
                enable_test_endpoints: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            governance: GovernanceConfig {
                default_age_days_threshold: 30,
                default_user_threshold: 0,
                default_admin_threshold: 2,
                enable_test_endpoints: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
