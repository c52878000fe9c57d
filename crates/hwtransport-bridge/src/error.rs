//! Error types for the bridge backend
//!
//! `BridgeError` describes what went wrong on the HTTP exchange; the `into_*`
//! methods translate it into the per-operation errors of the core contract.

use hwtransport_core::{
    AcquireError, BackendKind, CallError, ConfigError, InitError, ReleaseError, Session,
    TransportError,
};
use serde_json::Value;
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid bridge URL: {url}")]
    InvalidUrl { url: String },

    #[error("Bridge request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bridge did not answer within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Bridge answered {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("Malformed bridge reply: {0}")]
    Decode(String),
}

impl BridgeError {
    /// Lowercased remote error text, if the daemon sent one
    fn remote_message(&self) -> Option<String> {
        match self {
            BridgeError::Remote { message, .. } => Some(message.to_ascii_lowercase()),
            _ => None,
        }
    }

    pub fn into_init_error(self) -> InitError {
        match self {
            BridgeError::Timeout { duration_ms } => InitError::Timeout {
                kind: BackendKind::Bridge,
                duration_ms,
            },
            BridgeError::Decode(reason) => InitError::Handshake {
                kind: BackendKind::Bridge,
                reason,
            },
            other => InitError::unavailable(BackendKind::Bridge, other.to_string()),
        }
    }

    pub fn into_transport_error(self) -> TransportError {
        match self {
            BridgeError::Remote { .. } | BridgeError::Decode(_) => TransportError::Protocol {
                reason: self.to_string(),
            },
            _ => TransportError::Unavailable {
                reason: self.to_string(),
            },
        }
    }

    pub fn into_config_error(self) -> ConfigError {
        match self {
            BridgeError::Remote { message, .. } => ConfigError::Rejected { reason: message },
            other => ConfigError::Transport(other.into_transport_error()),
        }
    }

    pub fn into_acquire_error(self, path: &str) -> AcquireError {
        match self.remote_message() {
            Some(text) if text.contains("not found") => AcquireError::NotFound {
                path: path.to_string(),
            },
            Some(text)
                if text.contains("already")
                    || text.contains("in use")
                    || text.contains("busy")
                    || text.contains("wrong previous session") =>
            {
                AcquireError::Busy {
                    path: path.to_string(),
                }
            }
            _ => AcquireError::Transport(self.into_transport_error()),
        }
    }

    pub fn into_release_error(self, session: &Session) -> ReleaseError {
        match self.remote_message() {
            Some(text) if is_session_rejection(&text) => ReleaseError::Unknown {
                session: session.clone(),
            },
            _ => ReleaseError::Transport(self.into_transport_error()),
        }
    }

    pub fn into_call_error(self, session: &Session) -> CallError {
        if let Some(text) = self.remote_message() {
            if is_session_rejection(&text) {
                return CallError::InvalidSession {
                    session: session.clone(),
                };
            }
        }
        match self {
            BridgeError::Timeout { duration_ms } => CallError::Timeout { duration_ms },
            BridgeError::Remote { message, body, .. } => CallError::DeviceError { message, data: body },
            other => CallError::Transport(other.into_transport_error()),
        }
    }
}

fn is_session_rejection(text: &str) -> bool {
    text.contains("session not found")
        || text.contains("wrong session")
        || text.contains("invalid session")
        || text.contains("unknown session")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(message: &str) -> BridgeError {
        BridgeError::Remote {
            status: 400,
            message: message.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_acquire_mapping() {
        assert_eq!(
            remote("device not found").into_acquire_error("1"),
            AcquireError::NotFound { path: "1".into() }
        );
        assert_eq!(
            remote("Device is already in use").into_acquire_error("1"),
            AcquireError::Busy { path: "1".into() }
        );
        assert!(matches!(
            remote("internal failure").into_acquire_error("1"),
            AcquireError::Transport(TransportError::Protocol { .. })
        ));
    }

    #[test]
    fn test_call_mapping() {
        let session = Session::new("4");
        assert_eq!(
            remote("session not found").into_call_error(&session),
            CallError::InvalidSession { session: session.clone() }
        );
        assert_eq!(
            BridgeError::Timeout { duration_ms: 300 }.into_call_error(&session),
            CallError::Timeout { duration_ms: 300 }
        );
        assert!(matches!(
            remote("Action cancelled by user").into_call_error(&session),
            CallError::DeviceError { .. }
        ));
    }

    #[test]
    fn test_config_rejection_keeps_reason() {
        assert_eq!(
            remote("signature verification failed").into_config_error(),
            ConfigError::Rejected {
                reason: "signature verification failed".into()
            }
        );
    }
}
