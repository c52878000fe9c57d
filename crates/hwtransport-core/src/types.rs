//! Core data model shared by every backend
//!
//! Device descriptors, session tokens, request/response messages, the closed
//! set of backend kinds, and the millisecond clock used for cache-busting.

use core::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ----------------------------------------------------------------------------
// Backend Kind
// ----------------------------------------------------------------------------

/// Transport mechanism a backend is built on
///
/// The set is closed: the fallback chain only ever chooses between these three.
/// Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Browser extension relay
    Extension,
    /// Local HTTP bridge daemon
    Bridge,
    /// Native plugin host
    Plugin,
}

impl BackendKind {
    /// All kinds in probing order
    pub const ALL: [BackendKind; 3] = [BackendKind::Extension, BackendKind::Bridge, BackendKind::Plugin];

    /// Probing priority, lower is tried first
    pub fn priority(self) -> u8 {
        match self {
            BackendKind::Extension => 0,
            BackendKind::Bridge => 1,
            BackendKind::Plugin => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Extension => "extension",
            BackendKind::Bridge => "bridge",
            BackendKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

/// Opaque token granting exclusive access to one device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Session {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for Session {
    fn from(token: String) -> Self {
        Self(token)
    }
}

// ----------------------------------------------------------------------------
// Device Descriptor
// ----------------------------------------------------------------------------

/// Snapshot of one device as seen at enumeration time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    /// Backend-specific device path, stable while the device stays connected
    pub path: String,
    /// USB vendor id
    pub vendor: u16,
    /// USB product id
    pub product: u16,
    #[serde(default)]
    pub serial_number: String,
    /// Present only while some caller holds the device
    #[serde(default)]
    pub session: Option<Session>,
}

impl DeviceDescriptor {
    pub fn new(path: impl Into<String>, vendor: u16, product: u16) -> Self {
        Self {
            path: path.into(),
            vendor,
            product,
            serial_number: String::new(),
            session: None,
        }
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    /// Whether some caller currently holds this device
    pub fn is_acquired(&self) -> bool {
        self.session.is_some()
    }
}

// ----------------------------------------------------------------------------
// Message
// ----------------------------------------------------------------------------

/// Named request or response exchanged through `call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message type name, e.g. `Ping` or `Success`
    pub name: String,
    /// Message fields
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Message {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Message with an empty `{}` body
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, empty_object())
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Source of wall-clock timestamps
///
/// Lets the configuration loader be driven by a controlled clock in tests.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
