//! Settings for the default transport stack
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration and any section may be given partially.

use std::time::Duration;

use hwtransport_bridge::{BridgeConfig, BridgeFactory};
use hwtransport_core::{BackendFactory, FallbackChain, InitOptions};
use hwtransport_pipe::{ExtensionConfig, ExtensionFactory, PluginConfig, PluginFactory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Signed configuration blob location; unset or empty means the default
    pub config_url: Option<String>,
    /// Upper bound on each backend's `create()`; unset leaves it to the backend
    pub probe_timeout_ms: Option<u64>,
    /// Upper bound on the configuration download
    pub fetch_timeout_ms: u64,
    pub extension: ExtensionSettings,
    pub bridge: BridgeSettings,
    pub plugin: PluginSettings,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            config_url: None,
            probe_timeout_ms: None,
            fetch_timeout_ms: 30_000,
            extension: ExtensionSettings::default(),
            bridge: BridgeSettings::default(),
            plugin: PluginSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub relay: ExtensionConfig,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            relay: ExtensionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub daemon: BridgeConfig,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            daemon: BridgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub host: PluginConfig,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            host: PluginConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn init_options(&self) -> InitOptions {
        InitOptions {
            config_url: self.config_url.clone(),
        }
    }

    /// Enabled backends in priority order
    pub fn chain(&self) -> FallbackChain {
        let mut factories: Vec<Box<dyn BackendFactory>> = Vec::new();
        if self.extension.enabled {
            factories.push(Box::new(ExtensionFactory::new(self.extension.relay.clone())));
        }
        if self.bridge.enabled {
            factories.push(Box::new(BridgeFactory::new(self.bridge.daemon.clone())));
        }
        if self.plugin.enabled {
            factories.push(Box::new(PluginFactory::new(self.plugin.host.clone())));
        }

        let chain = FallbackChain::prioritized(factories);
        match self.probe_timeout_ms {
            Some(ms) => chain.with_probe_timeout(Duration::from_millis(ms)),
            None => chain,
        }
    }
}
