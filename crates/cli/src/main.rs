//! sessionkit CLI - authenticated requests with automatic token refresh

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "sessionkit")]
#[command(about = "Authenticated HTTP requests with single-flight token refresh")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Client configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "SESSIONKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.log_level.into(), cli.json_logs)?;
    debug!("Starting sessionkit CLI");

    let outcome = if cli.timeout == 0 {
        cli.command.execute(cli.config).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(cli.config)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!(
                "command timed out after {} seconds",
                cli.timeout
            )),
        }
    };

    if let Err(e) = outcome {
        error!("Command failed: {e}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch_with_globals() {
        let cli = Cli::try_parse_from([
            "sessionkit",
            "--log-level",
            "debug",
            "fetch",
            "/data",
            "--method",
            "POST",
            "--data",
            "{}",
            "--correlation-id",
            "abc",
        ])
        .unwrap();
        assert!(matches!(cli.log_level, LogLevel::Debug));
        match cli.command {
            Commands::Fetch {
                target,
                method,
                data,
                correlation_id,
                ..
            } => {
                assert_eq!(target, "/data");
                assert_eq!(method, "POST");
                assert_eq!(data.as_deref(), Some("{}"));
                assert_eq!(correlation_id.as_deref(), Some("abc"));
            }
            _ => panic!("expected fetch"),
        }
    }
}
