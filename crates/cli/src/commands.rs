//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use http::Method;
use sessionkit_core::{CorrelationId, Session, TokenStore};
use sessionkit_http::{AuthClient, RequestOptions};
use std::path::PathBuf;
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Perform one authenticated request, refreshing the token on a 401
    Fetch {
        /// Absolute URL, or a path resolved against `base_url`
        target: String,

        /// Access token to start with
        #[arg(long, env = "SESSIONKIT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Correlation id sent as x-correlation-id (generated when omitted)
        #[arg(long)]
        correlation_id: Option<String>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request body, sent as JSON
        #[arg(short = 'd', long)]
        data: Option<String>,
    },

    /// Decode an access token and print the session it describes
    Session {
        /// Access token to inspect
        #[arg(long, env = "SESSIONKIT_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default client configuration file
    Generate {
        /// Output file path
        #[arg(default_value = "sessionkit.json")]
        output: PathBuf,
    },

    /// Print the effective configuration
    Show,
}

impl Commands {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self {
            Commands::Fetch {
                target,
                token,
                correlation_id,
                method,
                data,
            } => {
                let config = config::load_client_config(config_path.as_deref())?;
                let client = AuthClient::from_config(&config)?;
                if let Some(token) = token {
                    client.login(token);
                }

                let correlation_id = correlation_id
                    .map(CorrelationId::from)
                    .unwrap_or_default();
                let options = request_options(&method, data)?;

                info!(%target, %correlation_id, "Sending request");
                let response = client.request(&target, &correlation_id, options).await?;

                println!("{}", response.status);
                println!("{}", response.text());
                if response.status.is_client_error() || response.status.is_server_error() {
                    bail!("request failed with status {}", response.status);
                }
                Ok(())
            }
            Commands::Session { token } => {
                let session = Session::new(TokenStore::with_token(token));
                let Some(payload) = session.current() else {
                    bail!("token could not be decoded");
                };

                println!("user id:       {}", payload.user_id);
                println!("username:      {}", payload.username);
                match session.expires_at() {
                    Some(expires_at) => println!("expires at:    {}", expires_at.to_rfc3339()),
                    None => println!("expires at:    never set"),
                }
                println!("authenticated: {}", session.is_authenticated());
                Ok(())
            }
            Commands::Config { command } => match command {
                ConfigCommands::Generate { output } => {
                    config::generate_default_config(&output)?;
                    info!("Generated client configuration at {}", output.display());
                    println!("{}", output.display());
                    Ok(())
                }
                ConfigCommands::Show => {
                    let config = config::load_client_config(config_path.as_deref())?;
                    println!("{}", serde_json::to_string_pretty(&config)?);
                    Ok(())
                }
            },
        }
    }
}

fn request_options(method: &str, data: Option<String>) -> Result<RequestOptions> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;
    let options = RequestOptions::new(method);
    match data {
        Some(data) => {
            let value: serde_json::Value =
                serde_json::from_str(&data).context("request body is not valid JSON")?;
            Ok(options.json(&value)?)
        }
        None => Ok(options),
    }
}
