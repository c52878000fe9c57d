//! Native plugin host backend
//!
//! Spawns the plugin host executable and speaks the pipe protocol over its
//! stdin/stdout. The host's stderr is passed through for diagnostics.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use hwtransport_core::{Backend, BackendFactory, BackendKind, InitError};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::backend::{PipeBackend, PipeTimeouts};
use crate::channel::PipeChannel;
use crate::error::PipeError;

/// Executable looked up on `PATH` when no program is configured
pub const DEFAULT_PLUGIN_PROGRAM: &str = "hwtransport-plugin-host";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub program: String,
    pub args: Vec<String>,
    pub probe_timeout_ms: u64,
    /// Bound on `configure`, `enumerate`, `acquire` and `release`
    pub op_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PLUGIN_PROGRAM.to_string(),
            args: Vec::new(),
            probe_timeout_ms: 2_000,
            op_timeout_ms: 5_000,
            call_timeout_ms: 60_000,
        }
    }
}

impl PluginConfig {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
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
pub struct PluginFactory {
    config: PluginConfig,
}

impl PluginFactory {
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    async fn spawn(&self) -> Result<PipeBackend, PipeError> {
        let program = &self.config.program;
        debug!("Starting plugin host {}", program);

        let spawn_error = |reason: String| PipeError::Spawn {
            program: program.clone(),
            reason,
        };
        let mut child = Command::new(program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;

        let channel = PipeChannel::new(stdout, stdin);
        let backend =
            PipeBackend::handshake(BackendKind::Plugin, channel, self.config.timeouts()).await?;
        Ok(backend.with_sync_support().with_child(child))
    }
}

#[async_trait]
impl BackendFactory for PluginFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::Plugin
    }

    async fn create(&self) -> Result<Box<dyn Backend>, InitError> {
        let backend = self
            .spawn()
            .await
            .map_err(|e| e.into_init_error(BackendKind::Plugin))?;
        Ok(Box::new(backend))
    }
}
