//! Hardware Transport
//!
//! Entry points for reaching a hardware security device through whichever
//! transport the host offers. Backends are tried in priority order (browser
//! extension relay, HTTP bridge daemon, native plugin host); the first one that
//! comes up is configured with a freshly fetched signed configuration and
//! returned as a [`Transport`].
//!
//! ```no_run
//! # async fn run() -> hwtransport::Result<()> {
//! let transport = hwtransport::init_transport(hwtransport::InitOptions::default()).await?;
//! for device in transport.enumerate(false).await? {
//!     println!("{} ({:04x}:{:04x})", device.path, device.vendor, device.product);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;

use tracing::info;

pub use config::{BridgeSettings, ExtensionSettings, PluginSettings, TransportConfig};
pub use hwtransport_bridge as bridge;
pub use hwtransport_core::{
    AcquireError, Backend, BackendFactory, BackendFailure, BackendKind, BlockingTransport,
    CallError, ConfigError, ConfigFetchError, ConfigLoader, ConfigSource, ConfigureError,
    DeviceDescriptor, FallbackChain, HttpConfigSource, HwtError, InitError, InitOptions, LoadError,
    Message, ReleaseError, Result, Session, Transport, TransportError, UnconfiguredTransport,
    DEFAULT_CONFIG_URL,
};
pub use hwtransport_pipe as pipe;

// ----------------------------------------------------------------------------
// Entry Points
// ----------------------------------------------------------------------------

/// The three real backends with default settings, in priority order
pub fn default_chain() -> FallbackChain {
    TransportConfig::default().chain()
}

/// Find the first available backend; it still has to be configured
pub async fn load_transport() -> core::result::Result<UnconfiguredTransport, LoadError> {
    load_transport_with(&TransportConfig::default()).await
}

pub async fn load_transport_with(
    config: &TransportConfig,
) -> core::result::Result<UnconfiguredTransport, LoadError> {
    config.chain().load().await
}

/// Fetch the configuration at `url` and apply it to `transport`
pub async fn configure_transport(
    transport: UnconfiguredTransport,
    url: &str,
) -> core::result::Result<Transport, ConfigureError> {
    let loader = ConfigLoader::new(HttpConfigSource::with_timeout(Some(
        TransportConfig::default().fetch_timeout(),
    ))?);
    loader.configure(transport, url).await
}

/// Discover a backend and configure it from `options`
pub async fn init_transport(options: InitOptions) -> Result<Transport> {
    let config = TransportConfig {
        config_url: options.config_url,
        ..TransportConfig::default()
    };
    init_transport_with(&config).await
}

/// [`init_transport`] with every backend and timeout taken from `config`
pub async fn init_transport_with(config: &TransportConfig) -> Result<Transport> {
    let loader = ConfigLoader::new(HttpConfigSource::with_timeout(Some(config.fetch_timeout()))?);
    let transport =
        hwtransport_core::init_transport(&config.chain(), &loader, &config.init_options()).await?;
    info!("Using {} transport ({})", transport.kind(), transport.name());
    Ok(transport)
}
