//! Hardware Transport Core
//!
//! This crate defines how callers reach a hardware security device without
//! knowing which transport mechanism carries the bytes. Backends (browser
//! extension relay, local HTTP bridge, native plugin) implement one capability
//! contract; a fallback chain picks the first one that comes up, and a
//! configuration loader applies a freshly fetched signed blob before the
//! transport is handed out.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod init;
pub mod loader;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{InitOptions, DEFAULT_CONFIG_URL};
pub use errors::{
    AcquireError, BackendFailure, CallError, ConfigError, ConfigFetchError, ConfigureError,
    HwtError, InitError, LoadError, ReleaseError, Result, TransportError,
};
pub use init::init_transport;
pub use loader::{with_timestamp, ConfigLoader, ConfigSource};
pub use session::SessionRegistry;
pub use transport::{
    Backend, BackendFactory, BlockingTransport, FallbackChain, Transport, UnconfiguredTransport,
};
pub use types::{
    BackendKind, DeviceDescriptor, Message, Session, SystemTimeSource, TimeSource, Timestamp,
};

#[cfg(feature = "http")]
pub use loader::HttpConfigSource;

// Re-exported for backend implementors
pub use async_trait::async_trait;
