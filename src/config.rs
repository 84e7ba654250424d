/// Configuration management for CivicFix
use crate::{
    error::{CivicError, CivicResult},
    moderation::MAX_BAN_DAYS,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// One year
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub moderation: ModerationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub bootstrap: BootstrapConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    pub photo_upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub photo_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens
    pub secret_key: String,
    pub session_ttl_hours: i64,
}

/// Ban handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub default_ban_days: i64,
    pub ban_sweep_interval_secs: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Superuser created at startup when none exists
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    pub superuser_username: Option<String>,
    pub superuser_email: Option<String>,
    pub superuser_password: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CivicResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CIVICFIX_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CIVICFIX_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| CivicError::Validation("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();
        let photo_upload_limit = env::var("CIVICFIX_PHOTO_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5242880);

        let data_directory: PathBuf = env::var("CIVICFIX_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("CIVICFIX_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("civicfix.sqlite"));
        let photo_directory = env::var("CIVICFIX_PHOTO_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("photos"));

        let secret_key = env::var("CIVICFIX_SECRET_KEY")
            .map_err(|_| CivicError::Validation("CIVICFIX_SECRET_KEY required".to_string()))?;
        let session_ttl_hours = env::var("CIVICFIX_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "336".to_string())
            .parse()
            .unwrap_or(336);

        let default_ban_days = env::var("CIVICFIX_DEFAULT_BAN_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);
        let ban_sweep_interval_secs = env::var("CIVICFIX_BAN_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .unwrap_or(900);

        let rate_limit_enabled = env::var("CIVICFIX_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bootstrap = BootstrapConfig {
            superuser_username: env::var("CIVICFIX_SUPERUSER_USERNAME").ok(),
            superuser_email: env::var("CIVICFIX_SUPERUSER_EMAIL").ok(),
            superuser_password: env::var("CIVICFIX_SUPERUSER_PASSWORD").ok(),
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                photo_upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                photo_directory,
            },
            authentication: AuthConfig {
                secret_key,
                session_ttl_hours,
            },
            moderation: ModerationConfig {
                default_ban_days,
                ban_sweep_interval_secs,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
            },
            logging: LoggingConfig { level: log_level },
            bootstrap,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CivicResult<()> {
        if self.service.hostname.is_empty() {
            return Err(CivicError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.secret_key.len() < 32 {
            return Err(CivicError::Validation(
                "Secret key must be at least 32 characters".to_string(),
            ));
        }

        if !(1..=MAX_BAN_DAYS).contains(&self.moderation.default_ban_days) {
            return Err(CivicError::Validation(format!(
                "Default ban duration must be between 1 and {} days",
                MAX_BAN_DAYS
            )));
        }

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.authentication.session_ttl_hours) {
            return Err(CivicError::Validation(format!(
                "Session lifetime must be between 1 and {} hours",
                MAX_SESSION_TTL_HOURS
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8000,
                version: "0.1.0".to_string(),
                photo_upload_limit: 5242880,
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from(":memory:"),
                photo_directory: PathBuf::from("./data/photos"),
            },
            authentication: AuthConfig {
                secret_key: "test-secret-key-for-testing-only-0123".to_string(),
                session_ttl_hours: 336,
            },
            moderation: ModerationConfig {
                default_ban_days: 7,
                ban_sweep_interval_secs: 900,
            },
            rate_limit: RateLimitConfig { enabled: false },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = test_config();
        config.authentication.secret_key = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ban() {
        let mut config = test_config();
        config.moderation.default_ban_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_durations() {
        let mut config = test_config();
        config.moderation.default_ban_days = MAX_BAN_DAYS + 1;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.moderation.default_ban_days = MAX_BAN_DAYS;
        assert!(config.validate().is_ok());

        let mut config = test_config();
        config.authentication.session_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());
    }
}
