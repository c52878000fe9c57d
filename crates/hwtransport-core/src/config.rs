//! Initialization options
//!
//! The configuration URL is passed explicitly through [`InitOptions`]; nothing
//! reads it from module state.

use serde::{Deserialize, Serialize};

/// Signed configuration used when the caller does not supply one
pub const DEFAULT_CONFIG_URL: &str = "https://mytrezor.s3.amazonaws.com/plugin/config_signed.bin";

/// Options accepted by `init_transport`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    /// Overrides [`DEFAULT_CONFIG_URL`]
    pub config_url: Option<String>,
}

impl InitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_url(mut self, url: impl Into<String>) -> Self {
        self.config_url = Some(url.into());
        self
    }

    /// URL the configuration is fetched from
    pub fn config_url(&self) -> &str {
        self.config_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_CONFIG_URL)
    }
}
