//! Test doubles for deterministic transport tests
//!
//! In-memory backend and factory with scripted outcomes, a config source that
//! records the URLs it was asked for, and a controllable clock. Enabled for
//! this crate's own tests and, through the `testing` feature, for dependents.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::errors::{
    AcquireError, CallError, ConfigError, ConfigFetchError, InitError, ReleaseError,
    TransportError,
};
use crate::loader::ConfigSource;
use crate::session::SessionRegistry;
use crate::transport::{Backend, BackendFactory};
use crate::types::{BackendKind, DeviceDescriptor, Message, Session, TimeSource, Timestamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Attempt Log
// ----------------------------------------------------------------------------

/// Shared record of which factories had `create()` called, in order
#[derive(Debug, Clone, Default)]
pub struct AttemptLog(Arc<Mutex<Vec<String>>>);

impl AttemptLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        lock(&self.0).push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.0).clone()
    }
}

// ----------------------------------------------------------------------------
// Mock Backend
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct MockState {
    configure_calls: AtomicUsize,
    last_config: Mutex<Option<Vec<u8>>>,
    reject_config: Mutex<Option<String>>,
    devices: Mutex<Vec<DeviceDescriptor>>,
    /// Bumped on every device list change
    device_version: watch::Sender<u64>,
    wait_timeout: Mutex<Duration>,
    sessions: SessionRegistry,
    replies: Mutex<HashMap<String, Result<Message, CallError>>>,
    calls: Mutex<Vec<(Session, Message)>>,
}

/// Inspection and control handle shared with every backend a factory creates
#[derive(Debug, Clone)]
pub struct MockHandle(Arc<MockState>);

impl Default for MockHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    pub fn new() -> Self {
        let (device_version, _) = watch::channel(0);
        Self(Arc::new(MockState {
            configure_calls: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            reject_config: Mutex::new(None),
            devices: Mutex::new(Vec::new()),
            device_version,
            wait_timeout: Mutex::new(Duration::from_secs(5)),
            sessions: SessionRegistry::new(),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }))
    }

    /// Number of `configure` attempts, successful or not
    pub fn configure_calls(&self) -> usize {
        self.0.configure_calls.load(Ordering::SeqCst)
    }

    /// Last accepted configuration blob
    pub fn last_config(&self) -> Option<Vec<u8>> {
        lock(&self.0.last_config).clone()
    }

    pub fn is_configured(&self) -> bool {
        self.last_config().is_some()
    }

    /// Make subsequent `configure` calls fail with `reason`
    pub fn reject_config(&self, reason: &str) {
        *lock(&self.0.reject_config) = Some(reason.to_string());
    }

    pub fn add_device(&self, device: DeviceDescriptor) {
        lock(&self.0.devices).push(device);
        self.0.device_version.send_modify(|version| *version += 1);
    }

    /// Unplug a device, invalidating any session on it
    pub fn remove_device(&self, path: &str) {
        lock(&self.0.devices).retain(|device| device.path != path);
        self.0.sessions.forget_path(path);
        self.0.device_version.send_modify(|version| *version += 1);
    }

    /// How long `enumerate(true)` waits for a device
    pub fn set_wait_timeout(&self, timeout: Duration) {
        *lock(&self.0.wait_timeout) = timeout;
    }

    /// Answer calls named `name` with `reply` instead of echoing
    pub fn script_reply(&self, name: &str, reply: Result<Message, CallError>) {
        lock(&self.0.replies).insert(name.to_string(), reply);
    }

    /// Every call that reached a valid session
    pub fn calls(&self) -> Vec<(Session, Message)> {
        lock(&self.0.calls).clone()
    }

    pub fn session_count(&self) -> usize {
        self.0.sessions.len()
    }

    fn snapshot(&self) -> Vec<DeviceDescriptor> {
        lock(&self.0.devices)
            .iter()
            .map(|device| {
                let mut device = device.clone();
                device.session = self.0.sessions.session_of(&device.path);
                device
            })
            .collect()
    }

    fn has_device(&self, path: &str) -> bool {
        lock(&self.0.devices).iter().any(|device| device.path == path)
    }
}

/// In-memory backend with scripted devices and replies
///
/// Unscripted calls are answered with `Success` carrying the request data.
#[derive(Debug)]
pub struct MockBackend {
    kind: BackendKind,
    name: String,
    supports_sync: bool,
    handle: MockHandle,
}

impl MockBackend {
    pub fn new(kind: BackendKind, name: &str) -> Self {
        Self::with_handle(kind, name, MockHandle::new())
    }

    pub fn with_handle(kind: BackendKind, name: &str, handle: MockHandle) -> Self {
        Self {
            kind,
            name: name.to_string(),
            supports_sync: false,
            handle,
        }
    }

    pub fn with_sync_support(mut self) -> Self {
        self.supports_sync = true;
        self
    }

    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
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
        let state = &self.handle.0;
        state.configure_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&state.reject_config).clone() {
            return Err(ConfigError::Rejected { reason });
        }
        *lock(&state.last_config) = Some(config.to_vec());
        Ok(())
    }

    async fn enumerate(&self, wait: bool) -> Result<Vec<DeviceDescriptor>, TransportError> {
        if wait {
            let mut changes = self.handle.0.device_version.subscribe();
            let deadline = tokio::time::Instant::now() + *lock(&self.handle.0.wait_timeout);
            while self.handle.snapshot().is_empty() {
                match tokio::time::timeout_at(deadline, changes.changed()).await {
                    Ok(Ok(())) => continue,
                    _ => break,
                }
            }
        }
        Ok(self.handle.snapshot())
    }

    async fn acquire(&self, path: &str) -> Result<Session, AcquireError> {
        // Give a concurrent acquire the chance to interleave
        tokio::task::yield_now().await;
        if !self.handle.has_device(path) {
            return Err(AcquireError::NotFound {
                path: path.to_string(),
            });
        }
        self.handle.0.sessions.acquire(path)
    }

    async fn release(&self, session: &Session) -> Result<(), ReleaseError> {
        self.handle.0.sessions.release(session).map(|_| ())
    }

    async fn call(&self, session: &Session, message: Message) -> Result<Message, CallError> {
        if self.handle.0.sessions.path_of(session).is_none() {
            return Err(CallError::InvalidSession {
                session: session.clone(),
            });
        }
        lock(&self.handle.0.calls).push((session.clone(), message.clone()));

        match lock(&self.handle.0.replies).get(&message.name) {
            Some(reply) => reply.clone(),
            None => Ok(Message::new("Success", message.data)),
        }
    }
}

// ----------------------------------------------------------------------------
// Mock Factory
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockOutcome {
    Succeed,
    Fail,
    Hang,
}

/// Factory whose `create()` succeeds, fails, or never completes
#[derive(Debug, Clone)]
pub struct MockFactory {
    kind: BackendKind,
    name: String,
    outcome: MockOutcome,
    supports_sync: bool,
    created: Arc<AtomicUsize>,
    handle: MockHandle,
    log: Option<AttemptLog>,
}

impl MockFactory {
    fn new(kind: BackendKind, name: &str, outcome: MockOutcome) -> Self {
        Self {
            kind,
            name: name.to_string(),
            outcome,
            supports_sync: false,
            created: Arc::new(AtomicUsize::new(0)),
            handle: MockHandle::new(),
            log: None,
        }
    }

    pub fn succeeding(kind: BackendKind, name: &str) -> Self {
        Self::new(kind, name, MockOutcome::Succeed)
    }

    pub fn failing(kind: BackendKind, name: &str) -> Self {
        Self::new(kind, name, MockOutcome::Fail)
    }

    pub fn hanging(kind: BackendKind, name: &str) -> Self {
        Self::new(kind, name, MockOutcome::Hang)
    }

    pub fn with_log(mut self, log: &AttemptLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn with_sync_support(mut self) -> Self {
        self.supports_sync = true;
        self
    }

    /// Number of times `create()` was entered
    pub fn create_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Handle shared by every backend this factory creates
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl BackendFactory for MockFactory {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn create(&self) -> Result<Box<dyn Backend>, InitError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.record(&self.name);
        }

        match self.outcome {
            MockOutcome::Succeed => {
                let mut backend = MockBackend::with_handle(self.kind, &self.name, self.handle.clone());
                backend.supports_sync = self.supports_sync;
                Ok(Box::new(backend))
            }
            MockOutcome::Fail => Err(InitError::unavailable(
                self.kind,
                format!("{} is not installed", self.name),
            )),
            MockOutcome::Hang => std::future::pending().await,
        }
    }
}

// ----------------------------------------------------------------------------
// Static Config Source
// ----------------------------------------------------------------------------

/// Config source answering every fetch with the same outcome
#[derive(Debug)]
pub struct StaticConfigSource {
    outcome: Result<Vec<u8>, ConfigFetchError>,
    requests: Mutex<Vec<String>>,
}

impl StaticConfigSource {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            outcome: Ok(body),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ConfigFetchError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// URLs requested so far, cache-busting query included
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ConfigFetchError> {
        lock(&self.requests).push(url.to_string());
        self.outcome.clone()
    }
}

// ----------------------------------------------------------------------------
// Mock Time Source
// ----------------------------------------------------------------------------

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    current_time: Arc<AtomicU64>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_at(start_time: u64) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(start_time)),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.current_time.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set_time(&self, millis: u64) {
        self.current_time.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current_time.load(Ordering::SeqCst))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
