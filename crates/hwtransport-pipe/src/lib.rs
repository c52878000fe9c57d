//! Framed JSON pipe backends for hwtransport
//!
//! Two transports share one wire protocol: the browser extension relay,
//! reached over a loopback TCP socket, and the native plugin host, a child
//! process driven over its standard streams. Both exchange length-prefixed
//! JSON frames ([`frame`]) carrying id-correlated requests and replies
//! ([`protocol`]), multiplexed by a [`PipeChannel`].

pub mod backend;
pub mod channel;
pub mod error;
pub mod extension;
pub mod frame;
pub mod plugin;
pub mod protocol;

pub use backend::{PipeBackend, PipeTimeouts};
pub use channel::PipeChannel;
pub use error::PipeError;
pub use extension::{ExtensionConfig, ExtensionFactory, DEFAULT_EXTENSION_ADDRESS};
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use plugin::{PluginConfig, PluginFactory, DEFAULT_PLUGIN_PROGRAM};
pub use protocol::{AcquireReply, ErrorCode, Op, PeerInfo, RemoteError, Reply, Request};
