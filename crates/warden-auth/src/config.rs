//! Authentication and authorization configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::GROUP_DEFAULT;

/// Root configuration for token issuance, caching and authorization.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "auth-service"
/// token_secret = "change-me"
/// access_token_ttl = "15m"
/// refresh_token_ttl = "24h"
/// cache_ttl = "15m"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim, checked when tokens are parsed.
    pub issuer: String,

    /// Shared HS256 secret.
    pub token_secret: String,

    /// Access token lifetime. Also the TTL of its session-store entry.
    #[serde(with = "humantime_serde")]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime. Also the TTL of its session-store entry.
    #[serde(with = "humantime_serde")]
    pub refresh_token_ttl: Duration,

    /// TTL of entity read-through entries, including not-found markers.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Group every new user is attached to at registration.
    pub default_group: String,

    /// Upper bound on concurrent per-group checks within one access decision.
    pub max_concurrent_group_checks: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "auth-service".to_string(),
            token_secret: String::new(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(24 * 60 * 60),
            cache_ttl: Duration::from_secs(15 * 60),
            default_group: GROUP_DEFAULT.to_string(),
            max_concurrent_group_checks: 16,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty, and
    /// `ConfigError::InvalidValue` for an empty issuer, empty default group,
    /// zero TTLs or a zero concurrency limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.is_empty() {
            return Err(ConfigError::Missing("auth.token_secret".to_string()));
        }

        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.default_group.is_empty() {
            return Err(ConfigError::InvalidValue(
                "default_group cannot be empty".to_string(),
            ));
        }

        for (name, ttl) in [
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
            ("cache_ttl", self.cache_ttl),
        ] {
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
        }

        if self.max_concurrent_group_checks == 0 {
            return Err(ConfigError::InvalidValue(
                "max_concurrent_group_checks must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AuthConfig {
        AuthConfig {
            token_secret: "secret".to_string(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "auth-service");
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert_eq!(config.default_group, "DEFAULT");
    }

    #[test]
    fn test_validate_requires_secret() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = AuthConfig {
            cache_ttl: Duration::ZERO,
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            max_concurrent_group_checks: 0,
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_humantime_durations() {
        let json = r#"{"token_secret":"s","access_token_ttl":"5m","refresh_token_ttl":"7d"}"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.access_token_ttl, Duration::from_secs(300));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(7 * 86_400));
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
    }
}
