//! Error types for transport selection, configuration and device access
//!
//! Each contract operation has its own error enum so callers can match on the
//! exact failure they care about (`AcquireError::Busy`, `CallError::InvalidSession`,
//! ...). `HwtError` unifies them for the top-level entry points.

use serde_json::Value;

use crate::types::{BackendKind, Session};

// ----------------------------------------------------------------------------
// Backend Creation
// ----------------------------------------------------------------------------

/// A backend's mechanism could not be brought up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("{kind} transport is not available: {reason}")]
    Unavailable { kind: BackendKind, reason: String },
    #[error("{kind} transport did not answer within {duration_ms}ms")]
    Timeout { kind: BackendKind, duration_ms: u64 },
    #[error("{kind} transport handshake failed: {reason}")]
    Handshake { kind: BackendKind, reason: String },
}

impl InitError {
    pub fn unavailable(kind: BackendKind, reason: impl Into<String>) -> Self {
        InitError::Unavailable {
            kind,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            InitError::Unavailable { kind, .. }
            | InitError::Timeout { kind, .. }
            | InitError::Handshake { kind, .. } => *kind,
        }
    }
}

/// One absorbed `create()` failure, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub kind: BackendKind,
    pub name: String,
    pub error: InitError,
}

/// The fallback chain ran out of candidates
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("No transport available{}", describe_failures(.failures))]
    NoTransportAvailable { failures: Vec<BackendFailure> },
}

impl LoadError {
    /// Failures in the order the backends were attempted
    pub fn failures(&self) -> &[BackendFailure] {
        match self {
            LoadError::NoTransportAvailable { failures } => failures,
        }
    }
}

fn describe_failures(failures: &[BackendFailure]) -> String {
    if failures.is_empty() {
        return ": no backends registered".to_string();
    }
    let parts: Vec<String> = failures
        .iter()
        .map(|failure| format!("{} ({})", failure.name, failure.error))
        .collect();
    format!(": {}", parts.join("; "))
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Retrieving the configuration blob failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigFetchError {
    #[error("Invalid configuration URL: {url}")]
    InvalidUrl { url: String },
    #[error("HTTP client could not be created: {reason}")]
    Client { reason: String },
    #[error("Configuration request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("Configuration request to {url} timed out")]
    Timeout { url: String },
    #[error("Configuration server answered {status} for {url}")]
    Status { url: String, status: u16 },
}

/// The backend did not accept a configuration blob
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration rejected: {reason}")]
    Rejected { reason: String },
    #[error("Configuration could not be delivered: {0}")]
    Transport(#[from] TransportError),
}

/// Configuring a freshly loaded transport failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigureError {
    #[error(transparent)]
    Fetch(#[from] ConfigFetchError),
    #[error(transparent)]
    Rejected(#[from] ConfigError),
}

// ----------------------------------------------------------------------------
// Device Operations
// ----------------------------------------------------------------------------

/// Backend-level failure not tied to one session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },
    #[error("Transport connection closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("Device {path} is held by another session")]
    Busy { path: String },
    #[error("Device {path} not found")]
    NotFound { path: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReleaseError {
    #[error("Session {session} is not held")]
    Unknown { session: Session },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    #[error("Session {session} is no longer valid")]
    InvalidSession { session: Session },
    #[error("No response within {duration_ms}ms")]
    Timeout { duration_ms: u64 },
    #[error("Device error: {message}")]
    DeviceError { message: String, data: Option<Value> },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ----------------------------------------------------------------------------
// Unified Error
// ----------------------------------------------------------------------------

/// Any failure surfaced by the public entry points
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HwtError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Configure(#[from] ConfigureError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error(transparent)]
    Release(#[from] ReleaseError),
    #[error(transparent)]
    Call(#[from] CallError),
}

impl From<ConfigFetchError> for HwtError {
    fn from(err: ConfigFetchError) -> Self {
        HwtError::Configure(err.into())
    }
}

impl From<ConfigError> for HwtError {
    fn from(err: ConfigError) -> Self {
        HwtError::Configure(err.into())
    }
}

pub type Result<T> = core::result::Result<T, HwtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transport_lists_every_failure() {
        let err = LoadError::NoTransportAvailable {
            failures: vec![
                BackendFailure {
                    kind: BackendKind::Extension,
                    name: "extension".into(),
                    error: InitError::unavailable(BackendKind::Extension, "connection refused"),
                },
                BackendFailure {
                    kind: BackendKind::Plugin,
                    name: "plugin".into(),
                    error: InitError::Timeout {
                        kind: BackendKind::Plugin,
                        duration_ms: 250,
                    },
                },
            ],
        };

        let text = err.to_string();
        assert!(text.starts_with("No transport available: extension"));
        assert!(text.contains("connection refused"));
        assert!(text.contains("250ms"));
        assert_eq!(err.failures()[1].error.kind(), BackendKind::Plugin);
    }

    #[test]
    fn test_empty_chain_message() {
        let err = LoadError::NoTransportAvailable { failures: vec![] };
        assert_eq!(err.to_string(), "No transport available: no backends registered");
    }

    #[test]
    fn test_fetch_error_lifts_into_unified_error() {
        let err: HwtError = ConfigFetchError::Status {
            url: "https://host/config".into(),
            status: 404,
        }
        .into();
        assert!(matches!(
            err,
            HwtError::Configure(ConfigureError::Fetch(ConfigFetchError::Status { status: 404, .. }))
        ));
    }
}
