//! Configuration loading for the hwt CLI
//!
//! Starts from the TOML file given with `--config` (or the built-in defaults)
//! and then applies command-line overrides on top.

use anyhow::Context;
use hwtransport::TransportConfig;
use tracing::info;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Load the file named on the command line, or defaults, then apply overrides
pub fn load_configuration(cli: &Cli) -> Result<TransportConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path))?;
            TransportConfig::from_toml_str(&text)?
        }
        None => TransportConfig::default(),
    };

    apply_overrides(&mut config, cli);

    if !config.extension.enabled && !config.bridge.enabled && !config.plugin.enabled {
        return Err(CliError::Config(
            "At least one transport must be enabled".to_string(),
        ));
    }
    Ok(config)
}

/// Command-line flags win over the file
pub fn apply_overrides(config: &mut TransportConfig, cli: &Cli) {
    if let Some(url) = &cli.config_url {
        config.config_url = Some(url.clone());
    }
    if let Some(url) = &cli.bridge_url {
        config.bridge.daemon.url = url.clone();
    }
    if cli.no_extension {
        config.extension.enabled = false;
    }
    if cli.no_bridge {
        config.bridge.enabled = false;
    }
    if cli.no_plugin {
        config.plugin.enabled = false;
    }
}
