//! Backend contract over a [`PipeChannel`]
//!
//! The peer on the other end of the pipe owns the devices and their sessions;
//! this side only forwards operations and maps the peer's error codes.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hwtransport_core::{
    AcquireError, Backend, BackendKind, CallError, ConfigError, DeviceDescriptor, Message,
    ReleaseError, Session, TransportError,
};
use tokio::process::Child;
use tracing::{debug, info};

use crate::channel::PipeChannel;
use crate::error::PipeError;
use crate::protocol::{AcquireReply, Op, PeerInfo};

/// Client-side bounds on each kind of exchange with the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeTimeouts {
    /// The `info` handshake
    pub probe: Duration,
    /// `configure`, `enumerate`, `acquire` and `release`
    pub operation: Duration,
    /// One `call`, and one `enumerate` that waits for a device
    pub call: Duration,
}

/// Backend talking to a peer process or relay through a framed pipe
#[derive(Debug)]
pub struct PipeBackend {
    kind: BackendKind,
    name: String,
    peer: PeerInfo,
    channel: PipeChannel,
    timeouts: PipeTimeouts,
    supports_sync: bool,
    /// Host process, killed when the backend drops
    child: Mutex<Option<Child>>,
}

impl PipeBackend {
    /// Ask the peer who it is, giving up after `timeouts.probe`
    pub async fn handshake(
        kind: BackendKind,
        channel: PipeChannel,
        timeouts: PipeTimeouts,
    ) -> Result<Self, PipeError> {
        debug!("Handshaking with {} peer", kind);
        let peer: PeerInfo = channel.request_as(Op::Info, Some(timeouts.probe)).await?;
        info!("{} peer {} {} is ready", kind, peer.name, peer.version);

        Ok(Self {
            kind,
            name: format!("{} {}", peer.name, peer.version),
            peer,
            channel,
            timeouts,
            supports_sync: false,
            child: Mutex::new(None),
        })
    }

    pub fn with_sync_support(mut self) -> Self {
        self.supports_sync = true;
        self
    }

    /// Tie the lifetime of `child` to this backend
    pub fn with_child(self, child: Child) -> Self {
        Self {
            child: Mutex::new(Some(child)),
            ..self
        }
    }

    pub fn peer(&self) -> &PeerInfo {
        &self.peer
    }
}

#[async_trait]
impl Backend for PipeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn supports_sync(&self) -> bool {
        self.supports_sync
    }

    async fn configure(&self, config: &[u8]) -> Result<(), ConfigError> {
        let op = Op::Configure {
            config: hex::encode(config),
        };
        self.channel
            .request(op, Some(self.timeouts.operation))
            .await
            .map_err(PipeError::into_config_error)?;
        Ok(())
    }

    async fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let listed = if wait {
            match self
                .channel
                .request_as(Op::Enumerate { wait: true }, Some(self.timeouts.call))
                .await
            {
                Err(PipeError::Timeout { duration_ms }) => {
                    debug!("No device appeared within {}ms", duration_ms);
                    self.channel
                        .request_as(Op::Enumerate { wait: false }, Some(self.timeouts.operation))
                        .await
                }
                listed => listed,
            }
        } else {
            self.channel
                .request_as(Op::Enumerate { wait: false }, Some(self.timeouts.operation))
                .await
        };
        listed.map_err(PipeError::into_transport_error)
    }

    async fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        let op = Op::Acquire {
            path: path.to_string(),
        };
        let reply: AcquireReply = self
            .channel
            .request_as(op, Some(self.timeouts.operation))
            .await
            .map_err(|e| e.into_acquire_error(path))?;
        Ok(reply.session)
    }

    async fn release(&self, session: &Session) -> Result<(), ReleaseError> {
        let op = Op::Release {
            session: session.clone(),
        };
        self.channel
            .request(op, Some(self.timeouts.operation))
            .await
            .map_err(|e| e.into_release_error(session))?;
        Ok(())
    }

    async fn call(&self, session: &Session, message: Message) -> Result<Message, CallError> {
        let op = Op::Call {
            session: session.clone(),
            message,
        };
        self.channel
            .request_as(op, Some(self.timeouts.call))
            .await
            .map_err(|e| e.into_call_error(session))
    }
}
