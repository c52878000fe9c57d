//! Transport capability contract and selection
//!
//! Every backend (extension relay, HTTP bridge, native plugin) implements
//! [`Backend`] and is brought up through a [`BackendFactory`]. The
//! [`FallbackChain`] picks the first factory that succeeds, and the facade types
//! make sure device operations are only reachable once configuration has been
//! applied.

pub mod facade;
pub mod failover;

use async_trait::async_trait;

use crate::errors::{AcquireError, CallError, ConfigError, InitError, ReleaseError, TransportError};
use crate::types::{BackendKind, DeviceDescriptor, Message, Session};

pub use facade::{BlockingTransport, Transport, UnconfiguredTransport};
pub use failover::FallbackChain;

// ----------------------------------------------------------------------------
// Backend Trait
// ----------------------------------------------------------------------------

/// Operations every transport backend provides
///
/// All methods take `&self`; backends keep their mutable state behind interior
/// locks so concurrent callers race on the backend, not on the handle.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Mechanism this backend is built on
    fn kind(&self) -> BackendKind;

    /// Human-readable identifier, e.g. the bridge version
    fn name(&self) -> &str;

    /// Whether the backend can also be driven from synchronous code
    fn supports_sync(&self) -> bool {
        false
    }

    /// Apply a configuration blob fetched from the trusted config URL
    async fn configure(&self, config: &[u8]) -> Result<(), ConfigError>;

    /// List visible devices
    ///
    /// With `wait`, suspends until at least one device shows up or the
    /// backend's own timeout elapses. Without it, returns immediately.
    async fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// Take exclusive hold of the device at `path`
    async fn acquire(&self, path: &str) -> Result<Session, AcquireError>;

    /// Give up a session; safe to call after the device vanished
    async fn release(&self, session: &Session) -> Result<(), ReleaseError>;

    /// Send one request and wait for its response
    async fn call(&self, session: &Session, message: Message) -> Result<Message, CallError>;
}

// ----------------------------------------------------------------------------
// Backend Factory Trait
// ----------------------------------------------------------------------------

/// Probes a mechanism and produces a backend when it is present
#[async_trait]
pub trait BackendFactory: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Bring the backend up, failing fast when the mechanism is absent
    async fn create(&self) -> Result<Box<dyn Backend>, InitError>;
}
