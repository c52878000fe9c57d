//! Facade handed to callers
//!
//! A backend picked by the fallback chain is wrapped in an
//! [`UnconfiguredTransport`]. It only becomes a [`Transport`] - the type that
//! exposes device operations - after `configure` succeeds, so an unconfigured
//! backend can never reach a caller.

use core::fmt;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::errors::{AcquireError, CallError, ConfigError, ReleaseError, TransportError};
use crate::transport::Backend;
use crate::types::{BackendKind, DeviceDescriptor, Message, Session};

// ----------------------------------------------------------------------------
// Unconfigured Transport
// ----------------------------------------------------------------------------

/// A created backend that has not been configured yet
pub struct UnconfiguredTransport {
    backend: Box<dyn Backend>,
}

impl UnconfiguredTransport {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn supports_sync(&self) -> bool {
        self.backend.supports_sync()
    }

    /// Apply `config` and promote to a usable transport
    ///
    /// On failure the backend is dropped; there is no way back to an
    /// unconfigured handle.
    pub async fn configure(self, config: &[u8]) -> Result<Transport, ConfigError> {
        debug!("Configuring {} transport with {} byte blob", self.kind(), config.len());
        self.backend.configure(config).await?;
        info!("{} transport configured", self.kind());
        Ok(Transport {
            backend: self.backend,
        })
    }
}

impl fmt::Debug for UnconfiguredTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnconfiguredTransport")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

/// Configured transport ready for device communication
pub struct Transport {
    backend: Box<dyn Backend>,
}

impl Transport {
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn supports_sync(&self) -> bool {
        self.backend.supports_sync()
    }

    pub async fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let devices = self.backend.enumerate(wait).await?;
        debug!("{} transport sees {} device(s)", self.kind(), devices.len());
        Ok(devices)
    }

    pub async fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        let session = self.backend.acquire(path).await?;
        debug!("Acquired {} as session {}", path, session);
        Ok(session)
    }

    pub async fn release(&self, session: &Session) -> Result<(), ReleaseError> {
        self.backend.release(session).await?;
        debug!("Released session {}", session);
        Ok(())
    }

    pub async fn call(&self, session: &Session, message: Message) -> Result<Message, CallError> {
        debug!("Calling {} on session {}", message.name, session);
        self.backend.call(session, message).await
    }

    /// Synchronous view for callers outside the async runtime
    ///
    /// Only offered by backends that advertise `supports_sync`. The returned
    /// handle must not be used from a runtime worker thread.
    pub fn blocking(&self, runtime: Handle) -> Option<BlockingTransport<'_>> {
        self.supports_sync().then_some(BlockingTransport {
            transport: self,
            runtime,
        })
    }

    /// Unwrap the configured backend
    pub fn into_backend(self) -> Box<dyn Backend> {
        self.backend
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("supports_sync", &self.supports_sync())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Blocking Transport
// ----------------------------------------------------------------------------

/// Blocking calling convention over a sync-capable transport
pub struct BlockingTransport<'a> {
    transport: &'a Transport,
    runtime: Handle,
}

impl BlockingTransport<'_> {
    /// Blocks the calling thread; with `wait`, until a device shows up or the backend gives up
    pub fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError> {
        self.runtime.block_on(self.transport.enumerate(wait))
    }

    pub fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        self.runtime.block_on(self.transport.acquire(path))
    }

    pub fn release(&self, session: &Session) -> Result<(), ReleaseError> {
        self.runtime.block_on(self.transport.release(session))
    }

    pub fn call(&self, session: &Session, message: Message) -> Result<Message, CallError> {
        self.runtime.block_on(self.transport.call(session, message))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::MockBackend;
    use serde_json::json;

    fn device(path: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(path, 0x534c, 0x0001)
    }

    #[tokio::test]
    async fn test_configure_promotes_same_backend() {
        let backend = MockBackend::new(BackendKind::Bridge, "bridge-a");
        let handle = backend.handle();
        let loaded = UnconfiguredTransport::new(Box::new(backend));

        let transport = loaded.configure(b"signed").await.unwrap();

        assert_eq!(transport.name(), "bridge-a");
        assert_eq!(handle.configure_calls(), 1);
        assert_eq!(handle.last_config().as_deref(), Some(&b"signed"[..]));
    }

    #[tokio::test]
    async fn test_rejected_config_never_yields_transport() {
        let backend = MockBackend::new(BackendKind::Plugin, "plugin");
        backend.handle().reject_config("bad signature");

        let err = UnconfiguredTransport::new(Box::new(backend))
            .configure(b"junk")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Rejected {
                reason: "bad signature".into()
            }
        );
    }

    #[tokio::test]
    async fn test_call_on_released_session_is_invalid() {
        let backend = MockBackend::new(BackendKind::Extension, "extension");
        backend.handle().add_device(device("1"));
        let transport = UnconfiguredTransport::new(Box::new(backend))
            .configure(b"")
            .await
            .unwrap();

        let session = transport.acquire("1").await.unwrap();
        let reply = transport
            .call(&session, Message::new("Ping", json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(reply.name, "Success");
        assert_eq!(reply.data, json!({"message": "hi"}));

        transport.release(&session).await.unwrap();
        let err = transport.call(&session, Message::empty("Ping")).await.unwrap_err();
        assert_eq!(err, CallError::InvalidSession { session });
    }

    #[tokio::test]
    async fn test_concurrent_acquire_yields_one_busy() {
        let backend = MockBackend::new(BackendKind::Bridge, "bridge");
        backend.handle().add_device(device("1"));
        let transport = UnconfiguredTransport::new(Box::new(backend))
            .configure(b"")
            .await
            .unwrap();

        let (first, second) = tokio::join!(transport.acquire("1"), transport.acquire("1"));
        let results = [first, second];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AcquireError::Busy { path }) if path == "1")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_view_requires_sync_support() {
        let plugin = MockBackend::new(BackendKind::Plugin, "plugin").with_sync_support();
        plugin.handle().add_device(device("1"));
        let transport = UnconfiguredTransport::new(Box::new(plugin))
            .configure(b"")
            .await
            .unwrap();

        let runtime = Handle::current();
        let listed = tokio::task::spawn_blocking(move || {
            let blocking = transport.blocking(runtime).expect("plugin supports sync");
            let session = blocking.acquire("1")?;
            blocking.release(&session)?;
            Ok::<_, crate::HwtError>(blocking.enumerate(false)?.len())
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(listed, 1);

        let bridge = UnconfiguredTransport::new(Box::new(MockBackend::new(BackendKind::Bridge, "bridge")))
            .configure(b"")
            .await
            .unwrap();
        assert!(bridge.blocking(Handle::current()).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_enumerate_waits_for_a_device() {
        let plugin = MockBackend::new(BackendKind::Plugin, "plugin").with_sync_support();
        let handle = plugin.handle();
        let transport = UnconfiguredTransport::new(Box::new(plugin))
            .configure(b"")
            .await
            .unwrap();

        let runtime = Handle::current();
        let waiting = tokio::task::spawn_blocking(move || {
            let blocking = transport.blocking(runtime).expect("plugin supports sync");
            blocking.enumerate(true)
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.add_device(device("late"));

        let devices = waiting.await.unwrap().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].path, "late");
    }
}
