//! Backend connection settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PasskeepError;

/// Paths and header names of the backend session endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Registration check, relative to the base URL.
    pub check: String,

    /// Credential exchange.
    pub login: String,

    /// Signup with a provider credential.
    pub signup: String,

    /// Server-side logout.
    pub logout: String,

    /// Response header carrying the application bearer token.
    pub authorization_header: String,

    /// Response header carrying the application refresh token.
    pub refresh_token_header: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            check: "auth/check".to_string(),
            login: "auth/login".to_string(),
            signup: "auth/signup".to_string(),
            logout: "auth/logout".to_string(),
            authorization_header: "authorization".to_string(),
            refresh_token_header: "refresh-token".to_string(),
        }
    }
}

/// Settings for the authenticated transport and the token cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL; endpoint paths are resolved against it.
    pub base_url: String,

    /// Session endpoints.
    pub endpoints: Endpoints,

    /// Per-request timeout applied by the HTTP client.
    pub request_timeout_secs: u64,

    /// Bound on the blocking token load when the cache is cold.
    pub cold_load_timeout_secs: u64,

    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for the given backend with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cold_load_timeout(&self) -> Duration {
        Duration::from_secs(self.cold_load_timeout_secs)
    }

    /// Reject settings that would make every request or cold load time out
    /// immediately.
    pub fn validate(&self) -> Result<(), PasskeepError> {
        if self.request_timeout_secs == 0 {
            return Err(PasskeepError::Config {
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.cold_load_timeout_secs == 0 {
            return Err(PasskeepError::Config {
                message: "cold_load_timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            endpoints: Endpoints::default(),
            request_timeout_secs: 30,
            cold_load_timeout_secs: 5,
            user_agent: format!("passkeep/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"base_url": "https://books.example.com/api/", "endpoints": {"login": "v2/login"}}"#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://books.example.com/api/");
        assert_eq!(config.endpoints.login, "v2/login");
        assert_eq!(config.endpoints.logout, "auth/logout");
        assert_eq!(config.cold_load_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = ClientConfig::default();
        config.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(PasskeepError::Config { .. })));

        let mut config = ClientConfig::default();
        config.cold_load_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(PasskeepError::Config { .. })));
    }
}
