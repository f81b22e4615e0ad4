use anyhow::Result;
use sessionkit_core::tracing::{InstrumentationConfig, init_tracing};
use tracing::Level;

/// Initialize logging for the CLI
///
/// `RUST_LOG` overrides the level given on the command line.
pub fn init_logging(log_level: Level, json: bool) -> Result<()> {
    let level_str = log_level.as_str().to_lowercase();
    let config = InstrumentationConfig {
        service_name: "sessionkit-cli".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: format!(
            "sessionkit={level_str},sessionkit_core={level_str},sessionkit_http={level_str}"
        ),
        json,
    };
    init_tracing(&config)
}
