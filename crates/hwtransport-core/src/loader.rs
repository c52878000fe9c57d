//! Configuration loader
//!
//! Fetches the signed configuration blob and applies it to a freshly loaded
//! transport. Every fetch appends the current epoch milliseconds as the query
//! string (`<url>?<millis>`) so no HTTP cache can serve a stale blob after the
//! server rotates it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::{ConfigFetchError, ConfigureError};
use crate::transport::{Transport, UnconfiguredTransport};
use crate::types::{SystemTimeSource, TimeSource, Timestamp};

// ----------------------------------------------------------------------------
// Config Source Trait
// ----------------------------------------------------------------------------

/// Retrieves raw configuration bytes from a URL
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ConfigFetchError>;
}

#[async_trait]
impl<S: ConfigSource + ?Sized> ConfigSource for Arc<S> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ConfigFetchError> {
        (**self).fetch(url).await
    }
}

/// Append the cache-busting timestamp to `url`
pub fn with_timestamp(url: &str, at: Timestamp) -> String {
    format!("{}?{}", url, at.as_millis())
}

// ----------------------------------------------------------------------------
// HTTP Config Source
// ----------------------------------------------------------------------------

/// Plain HTTP(S) GET through reqwest
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpConfigSource {
    pub fn new() -> Result<Self, ConfigFetchError> {
        Self::with_timeout(None)
    }

    /// Source whose requests give up after `timeout`
    pub fn with_timeout(timeout: Option<std::time::Duration>) -> Result<Self, ConfigFetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ConfigFetchError::Client {
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ConfigFetchError> {
        let target = reqwest::Url::parse(url).map_err(|_| ConfigFetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigFetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| request_error(url, e))?;
        Ok(body.to_vec())
    }
}

#[cfg(feature = "http")]
fn request_error(url: &str, err: reqwest::Error) -> ConfigFetchError {
    if err.is_timeout() {
        ConfigFetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        ConfigFetchError::Request {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Config Loader
// ----------------------------------------------------------------------------

/// Fetches configuration and hands it to a loaded transport
#[derive(Debug, Clone)]
pub struct ConfigLoader<S, C = SystemTimeSource> {
    source: S,
    clock: C,
}

impl<S: ConfigSource> ConfigLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            clock: SystemTimeSource,
        }
    }
}

impl<S: ConfigSource, C: TimeSource> ConfigLoader<S, C> {
    pub fn with_clock(source: S, clock: C) -> Self {
        Self { source, clock }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the blob behind `url`, bypassing caches
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ConfigFetchError> {
        let target = with_timestamp(url, self.clock.now());
        debug!("Fetching transport configuration from {}", target);
        let blob = self.source.fetch(&target).await?;
        debug!("Received {} byte configuration", blob.len());
        Ok(blob)
    }

    /// Fetch and apply configuration, yielding the same backend ready for use
    ///
    /// A failed fetch or a rejected blob fails the whole operation; the
    /// transport is dropped rather than returned unconfigured.
    pub async fn configure(
        &self,
        transport: UnconfiguredTransport,
        url: &str,
    ) -> Result<Transport, ConfigureError> {
        let blob = self.fetch(url).await?;
        let configured = transport.configure(&blob).await?;
        info!("Transport {} ready", configured.name());
        Ok(configured)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;
    use crate::testing::{MockBackend, MockTimeSource, StaticConfigSource};
    use crate::types::BackendKind;

    fn loaded(backend: MockBackend) -> UnconfiguredTransport {
        UnconfiguredTransport::new(Box::new(backend))
    }

    #[test]
    fn test_with_timestamp_format() {
        assert_eq!(
            with_timestamp("https://host/config", Timestamp::new(1_690_000_000_123)),
            "https://host/config?1690000000123"
        );
    }

    #[tokio::test]
    async fn test_query_changes_between_calls() {
        let source = Arc::new(StaticConfigSource::new(b"blob".to_vec()));
        let clock = MockTimeSource::new_at(1_690_000_000_000);
        let loader = ConfigLoader::with_clock(Arc::clone(&source), clock.clone());

        loader.fetch("https://host/config").await.unwrap();
        clock.advance(5);
        loader.fetch("https://host/config").await.unwrap();

        let requests = source.requests();
        assert_eq!(requests[0], "https://host/config?1690000000000");
        assert_eq!(requests[1], "https://host/config?1690000000005");
        assert_ne!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn test_configure_passes_body_verbatim() {
        let loader = ConfigLoader::new(StaticConfigSource::new(vec![0x00, 0xff, 0x10]));
        let backend = MockBackend::new(BackendKind::Bridge, "bridge");
        let handle = backend.handle();

        let transport = loader.configure(loaded(backend), "https://host/config").await.unwrap();

        assert_eq!(transport.name(), "bridge");
        assert_eq!(handle.last_config(), Some(vec![0x00, 0xff, 0x10]));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_configure() {
        let loader = ConfigLoader::new(StaticConfigSource::failing(ConfigFetchError::Status {
            url: "https://host/config".into(),
            status: 503,
        }));
        let backend = MockBackend::new(BackendKind::Bridge, "bridge");
        let handle = backend.handle();

        let err = loader
            .configure(loaded(backend), "https://host/config")
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigureError::Fetch(ConfigFetchError::Status { status: 503, .. })));
        assert_eq!(handle.configure_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_fatal() {
        let loader = ConfigLoader::new(StaticConfigSource::new(b"tampered".to_vec()));
        let backend = MockBackend::new(BackendKind::Plugin, "plugin");
        backend.handle().reject_config("signature mismatch");

        let err = loader
            .configure(loaded(backend), "https://host/config")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConfigureError::Rejected(ConfigError::Rejected {
                reason: "signature mismatch".into()
            })
        );
    }
}
