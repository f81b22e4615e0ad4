//! CLI configuration utilities

use anyhow::{Context, Result};
use sessionkit_http::AuthClientConfig;
use std::path::Path;

/// Load client configuration from defaults, an optional file and the environment
pub fn load_client_config(path: Option<&Path>) -> Result<AuthClientConfig> {
    let path = path
        .map(|p| {
            p.to_str()
                .with_context(|| format!("config path {} is not valid UTF-8", p.display()))
        })
        .transpose()?;
    let config = AuthClientConfig::load(path).context("failed to load client configuration")?;
    config.validate()?;
    Ok(config)
}

/// Save client configuration to a JSON file
pub fn save_client_config<P: AsRef<Path>>(config: &AuthClientConfig, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Generate a default configuration file
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    save_client_config(&AuthClientConfig::default(), path)
}
