//! Top-level initialization: discover, then configure

use tracing::info;

use crate::config::InitOptions;
use crate::errors::Result;
use crate::loader::{ConfigLoader, ConfigSource};
use crate::transport::{FallbackChain, Transport};
use crate::types::TimeSource;

/// Discover a backend through `chain` and configure it from the options' URL
///
/// The returned transport has always been configured successfully.
pub async fn init_transport<S, C>(
    chain: &FallbackChain,
    loader: &ConfigLoader<S, C>,
    options: &InitOptions,
) -> Result<Transport>
where
    S: ConfigSource,
    C: TimeSource,
{
    let loaded = chain.load().await?;
    info!("Configuring {} transport from {}", loaded.kind(), options.config_url());
    let transport = loader.configure(loaded, options.config_url()).await?;
    Ok(transport)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
