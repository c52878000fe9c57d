//! Configuration for the HTTP bridge backend

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address the bridge daemon listens on by default
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:21324";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the bridge daemon
    pub url: String,
    /// How long `create()` waits for the daemon to answer
    pub probe_timeout_ms: u64,
    /// Bound on `/configure`, `/enumerate`, `/acquire` and `/release`
    pub op_timeout_ms: u64,
    /// Client-side bound on one `/listen` long-poll
    pub listen_timeout_ms: u64,
    /// Bound on one `/call` round trip, user confirmation on the device included
    pub call_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BRIDGE_URL.to_string(),
            probe_timeout_ms: 1_000,
            op_timeout_ms: 5_000,
            listen_timeout_ms: 10_000,
            call_timeout_ms: 120_000,
        }
    }
}

impl BridgeConfig {
    /// Configuration for a bridge at `url` with default timeouts
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_millis(self.listen_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
