//! Error types for the pipe backends

use std::io;

use hwtransport_core::{
    AcquireError, BackendKind, CallError, ConfigError, InitError, ReleaseError, Session,
    TransportError,
};
use serde_json::Value;
use thiserror::Error;

use crate::protocol::{ErrorCode, RemoteError};

#[derive(Error, Debug)]
pub enum PipeError {
    #[error("Pipe I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Frame of {len} bytes exceeds the limit")]
    FrameTooLarge { len: usize },

    #[error("Malformed pipe document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Peer closed the pipe")]
    Closed,

    #[error("Peer did not answer within {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Could not start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error(transparent)]
    Remote(RemoteError),
}

impl PipeError {
    fn remote_code(&self) -> Option<ErrorCode> {
        match self {
            PipeError::Remote(remote) => Some(remote.code),
            _ => None,
        }
    }

    pub fn into_init_error(self, kind: BackendKind) -> InitError {
        match self {
            PipeError::Timeout { duration_ms } => InitError::Timeout { kind, duration_ms },
            PipeError::Remote(_) | PipeError::Decode(_) | PipeError::FrameTooLarge { .. } => {
                InitError::Handshake {
                    kind,
                    reason: self.to_string(),
                }
            }
            other => InitError::unavailable(kind, other.to_string()),
        }
    }

    pub fn into_transport_error(self) -> TransportError {
        match self {
            PipeError::Closed => TransportError::Closed,
            PipeError::Io(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::BrokenPipe
                        | io::ErrorKind::ConnectionReset
                        | io::ErrorKind::UnexpectedEof
                ) =>
            {
                TransportError::Closed
            }
            PipeError::Remote(_) | PipeError::Decode(_) | PipeError::FrameTooLarge { .. } => {
                TransportError::Protocol {
                    reason: self.to_string(),
                }
            }
            other => TransportError::Unavailable {
                reason: other.to_string(),
            },
        }
    }

    pub fn into_config_error(self) -> ConfigError {
        match self {
            PipeError::Remote(remote) if remote.code == ErrorCode::Rejected => ConfigError::Rejected {
                reason: remote.message,
            },
            other => ConfigError::Transport(other.into_transport_error()),
        }
    }

    pub fn into_acquire_error(self, path: &str) -> AcquireError {
        match self.remote_code() {
            Some(ErrorCode::Busy) => AcquireError::Busy {
                path: path.to_string(),
            },
            Some(ErrorCode::NotFound) => AcquireError::NotFound {
                path: path.to_string(),
            },
            _ => AcquireError::Transport(self.into_transport_error()),
        }
    }

    pub fn into_release_error(self, session: &Session) -> ReleaseError {
        match self.remote_code() {
            Some(ErrorCode::UnknownSession | ErrorCode::InvalidSession) => ReleaseError::Unknown {
                session: session.clone(),
            },
            _ => ReleaseError::Transport(self.into_transport_error()),
        }
    }

    pub fn into_call_error(self, session: &Session) -> CallError {
        match self {
            PipeError::Timeout { duration_ms } => CallError::Timeout { duration_ms },
            PipeError::Remote(remote) => match remote.code {
                ErrorCode::InvalidSession | ErrorCode::UnknownSession => CallError::InvalidSession {
                    session: session.clone(),
                },
                ErrorCode::Timeout => CallError::Timeout {
                    duration_ms: remote
                        .data
                        .as_ref()
                        .and_then(|data| data.get("duration_ms"))
                        .and_then(Value::as_u64)
                        .unwrap_or_default(),
                },
                ErrorCode::Device => CallError::DeviceError {
                    message: remote.message,
                    data: remote.data,
                },
                _ => CallError::Transport(PipeError::Remote(remote).into_transport_error()),
            },
            other => CallError::Transport(other.into_transport_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(code: ErrorCode) -> PipeError {
        PipeError::Remote(RemoteError::new(code, "nope"))
    }

    #[test]
    fn test_closed_pipe_maps_to_closed() {
        assert_eq!(PipeError::Closed.into_transport_error(), TransportError::Closed);
        let broken = PipeError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(broken.into_transport_error(), TransportError::Closed);
    }

    #[test]
    fn test_operation_codes() {
        assert_eq!(
            remote(ErrorCode::Busy).into_acquire_error("p"),
            AcquireError::Busy { path: "p".into() }
        );
        assert_eq!(
            remote(ErrorCode::UnknownSession).into_release_error(&Session::new("1")),
            ReleaseError::Unknown {
                session: Session::new("1")
            }
        );
        assert_eq!(
            remote(ErrorCode::Rejected).into_config_error(),
            ConfigError::Rejected {
                reason: "nope".into()
            }
        );
    }

    #[test]
    fn test_call_codes() {
        let session = Session::new("9");
        let timeout = PipeError::Remote(
            RemoteError::new(ErrorCode::Timeout, "slow").with_data(json!({"duration_ms": 500})),
        );
        assert_eq!(
            timeout.into_call_error(&session),
            CallError::Timeout { duration_ms: 500 }
        );
        assert!(matches!(
            remote(ErrorCode::Unsupported).into_call_error(&session),
            CallError::Transport(TransportError::Protocol { .. })
        ));
    }

    #[test]
    fn test_handshake_failures() {
        assert!(matches!(
            remote(ErrorCode::Other).into_init_error(BackendKind::Plugin),
            InitError::Handshake {
                kind: BackendKind::Plugin,
                ..
            }
        ));
        assert!(matches!(
            PipeError::Io(io::Error::from(io::ErrorKind::ConnectionRefused))
                .into_init_error(BackendKind::Extension),
            InitError::Unavailable {
                kind: BackendKind::Extension,
                ..
            }
        ));
    }
}
