//! HTTP bridge backend for hwtransport
//!
//! A bridge daemon runs on the host, owns the USB devices and exposes them over
//! a small JSON-over-HTTP API on the loopback interface. This crate provides the
//! [`BridgeFactory`] that probes for the daemon and the [`BridgeBackend`] that
//! implements the transport contract against it.

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

pub use config::{BridgeConfig, DEFAULT_BRIDGE_URL};
pub use error::BridgeError;
pub use protocol::{AcquireReply, BridgeInfo, ErrorBody, WireMessage};
pub use transport::{BridgeBackend, BridgeFactory};
