//! Browser extension relay backend
//!
//! The extension's native-messaging host listens on a loopback TCP port and
//! relays frames to the extension, which owns the devices.

use std::time::Duration;

use async_trait::async_trait;
use hwtransport_core::{Backend, BackendFactory, BackendKind, InitError};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::debug;

use crate::backend::{PipeBackend, PipeTimeouts};
use crate::channel::PipeChannel;
use crate::error::PipeError;

pub const DEFAULT_EXTENSION_ADDRESS: &str = "127.0.0.1:21325";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// `host:port` of the relay
    pub address: String,
    pub probe_timeout_ms: u64,
    /// Bound on `configure`, `enumerate`, `acquire` and `release`
    pub op_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_EXTENSION_ADDRESS.to_string(),
            probe_timeout_ms: 1_000,
            op_timeout_ms: 5_000,
            call_timeout_ms: 60_000,
        }
    }
}

impl ExtensionConfig {
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn timeouts(&self) -> PipeTimeouts {
        PipeTimeouts {
            probe: self.probe_timeout(),
            operation: Duration::from_millis(self.op_timeout_ms),
            call: self.call_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionFactory {
    config: ExtensionConfig,
}

impl ExtensionFactory {
    pub fn new(config: ExtensionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    async fn connect(&self) -> Result<PipeBackend, PipeError> {
        let probe = self.config.probe_timeout();
        debug!("Connecting to extension relay at {}", self.config.address);

        let stream = tokio::time::timeout(probe, TcpStream::connect(&self.config.address))
            .await
            .map_err(|_| PipeError::Timeout {
                duration_ms: self.config.probe_timeout_ms,
            })??;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        let channel = PipeChannel::new(reader, writer);
        PipeBackend::handshake(BackendKind::Extension, channel, self.config.timeouts()).await
    }
}

#[async_trait]
impl BackendFactory for ExtensionFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Extension
    }

    async fn create(&self) -> Result<Box<dyn Backend>, InitError> {
        let backend = self
            .connect()
            .await
            .map_err(|e| e.into_init_error(BackendKind::Extension))?;
        Ok(Box::new(backend))
    }
}
