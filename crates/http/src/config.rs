//! Client configuration

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::ClientError;

/// Environment variable prefix, e.g. `SESSIONKIT__AUTH_API_URL`
const ENV_PREFIX: &str = "SESSIONKIT";

/// Settings for an [`AuthClient`](crate::AuthClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClientConfig {
    /// Base URL that relative request targets are resolved against
    #[serde(default)]
    pub base_url: Option<String>,
    /// Base URL of the authentication API
    pub auth_api_url: String,
    /// Path of the refresh endpoint, relative to `auth_api_url`
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// User agent sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_refresh_path() -> String {
    "refresh".to_string()
}

impl Default for AuthClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_api_url: "http://localhost:8080/auth/".to_string(),
            refresh_path: default_refresh_path(),
            timeout_secs: None,
            user_agent: None,
        }
    }
}

impl AuthClientConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// Environment variables use the `SESSIONKIT` prefix with `__` as the
    /// separator and override file settings.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Start with defaults
        builder = builder.add_source(Config::try_from(&AuthClientConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Check that the configured URLs are usable
    pub fn validate(&self) -> Result<(), ClientError> {
        Url::parse(&self.auth_api_url).map_err(|err| {
            ClientError::Configuration(format!("auth_api_url '{}': {err}", self.auth_api_url))
        })?;
        if let Some(base_url) = &self.base_url {
            Url::parse(base_url).map_err(|err| {
                ClientError::Configuration(format!("base_url '{base_url}': {err}"))
            })?;
        }
        if self.refresh_path.trim().is_empty() {
            return Err(ClientError::Configuration(
                "refresh_path must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Full URL of the refresh endpoint
    pub fn refresh_url(&self) -> String {
        format!(
            "{}/{}",
            self.auth_api_url.trim_end_matches('/'),
            self.refresh_path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
