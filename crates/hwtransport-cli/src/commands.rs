//! Command handlers for the hwt CLI

use hwtransport::{
    init_transport_with, load_transport_with, HwtError, Message, Transport, TransportConfig,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::cli::Commands;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, config: &TransportConfig) -> Result<()> {
        let output = match command {
            Commands::Probe => Self::handle_probe_command(config).await?,
            Commands::Devices { wait } => Self::handle_devices_command(config, wait).await?,
            Commands::Call { path, name, data } => {
                let message = Message::new(name, parse_payload(data.as_deref())?);
                Self::handle_call_command(config, &path, message).await?
            }
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Run the fallback chain only
    async fn handle_probe_command(config: &TransportConfig) -> Result<Value> {
        let transport = load_transport_with(config).await.map_err(HwtError::from)?;
        info!("{} transport is available", transport.kind());
        Ok(json!({
            "kind": transport.kind(),
            "name": transport.name(),
            "supports_sync": transport.supports_sync(),
        }))
    }

    async fn handle_devices_command(config: &TransportConfig, wait: bool) -> Result<Value> {
        let transport = init_transport_with(config).await?;
        let devices = transport.enumerate(wait).await.map_err(HwtError::from)?;
        info!("Found {} device(s)", devices.len());
        Ok(serde_json::to_value(devices)?)
    }

    async fn handle_call_command(
        config: &TransportConfig,
        path: &str,
        message: Message,
    ) -> Result<Value> {
        let transport = init_transport_with(config).await?;
        let response = call_once(&transport, path, message).await?;
        Ok(serde_json::to_value(response)?)
    }
}

/// Acquire `path`, send `message` and release the session whatever the outcome
async fn call_once(transport: &Transport, path: &str, message: Message) -> Result<Message> {
    let session = transport.acquire(path).await.map_err(HwtError::from)?;
    info!("Acquired {} as session {}", path, session);

    let response = transport.call(&session, message).await;

    if let Err(e) = transport.release(&session).await {
        warn!("Failed to release session {}: {}", session, e);
    }
    Ok(response.map_err(HwtError::from)?)
}

/// `--data` must be a JSON object; absent means `{}`
fn parse_payload(data: Option<&str>) -> Result<Value> {
    let Some(text) = data else {
        return Ok(json!({}));
    };
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(CliError::InvalidArgument(format!(
            "--data must be a JSON object, got {}",
            value
        )));
    }
    Ok(value)
}
