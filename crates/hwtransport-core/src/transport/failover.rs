//! Backend discovery with ordered fallback
//!
//! Candidates are probed strictly one after another. The first `create()` that
//! succeeds wins and later candidates are never touched; failures are logged and
//! collected so a fully failed discovery can say why each backend was skipped.

use core::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{BackendFailure, InitError, LoadError};
use crate::transport::{Backend, BackendFactory, UnconfiguredTransport};
use crate::types::BackendKind;

// ----------------------------------------------------------------------------
// Fallback Chain
// ----------------------------------------------------------------------------

/// Ordered list of backend factories
#[derive(Default)]
pub struct FallbackChain {
    candidates: Vec<Box<dyn BackendFactory>>,
    /// Upper bound for a single `create()`; `None` trusts backends to fail fast
    probe_timeout: Option<Duration>,
}

impl FallbackChain {
    /// Empty chain; candidates are tried in insertion order
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain in the standard priority order: extension, bridge, plugin
    ///
    /// Sorting is stable, so factories of the same kind keep their relative order.
    pub fn prioritized(mut factories: Vec<Box<dyn BackendFactory>>) -> Self {
        factories.sort_by_key(|factory| factory.kind().priority());
        Self {
            candidates: factories,
            probe_timeout: None,
        }
    }

    pub fn push(&mut self, factory: Box<dyn BackendFactory>) {
        self.candidates.push(factory);
    }

    pub fn with(mut self, factory: impl BackendFactory + 'static) -> Self {
        self.push(Box::new(factory));
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout
    }

    /// Kinds in the order they will be attempted
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.candidates.iter().map(|factory| factory.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Create the first available backend
    pub async fn load(&self) -> Result<UnconfiguredTransport, LoadError> {
        let mut failures = Vec::new();

        for factory in &self.candidates {
            debug!("Probing {} transport ({})", factory.kind(), factory.name());

            match self.create(factory.as_ref()).await {
                Ok(backend) => {
                    info!(
                        "Selected {} transport {} after {} failed attempt(s)",
                        backend.kind(),
                        backend.name(),
                        failures.len()
                    );
                    return Ok(UnconfiguredTransport::new(backend));
                }
                Err(error) => {
                    warn!("{} transport unavailable: {}", factory.name(), error);
                    failures.push(BackendFailure {
                        kind: factory.kind(),
                        name: factory.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(LoadError::NoTransportAvailable { failures })
    }

    async fn create(&self, factory: &dyn BackendFactory) -> Result<Box<dyn Backend>, InitError> {
        match self.probe_timeout {
            None => factory.create().await,
            Some(limit) => match tokio::time::timeout(limit, factory.create()).await {
                Ok(result) => result,
                Err(_) => Err(InitError::Timeout {
                    kind: factory.kind(),
                    duration_ms: limit.as_millis() as u64,
                }),
            },
        }
    }
}

impl fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.candidates.iter().map(|factory| factory.name()).collect();
        f.debug_struct("FallbackChain")
            .field("candidates", &names)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
