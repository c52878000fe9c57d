//! Request and reply documents carried inside frames
//!
//! Requests carry a caller-chosen `id` and an `op` tag; the peer echoes the
//! `id` on its reply, which holds either `ok` or `error`. Replies may arrive in
//! any order.

use core::fmt;

use hwtransport_core::{Message, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ----------------------------------------------------------------------------
// Requests
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    #[serde(flatten)]
    pub op: Op,
}

/// Operation requested from the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Info,
    /// Hex-encoded configuration blob
    Configure { config: String },
    Enumerate { wait: bool },
    Acquire { path: String },
    Release { session: Session },
    Call { session: Session, message: Message },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Info => "info",
            Op::Configure { .. } => "configure",
            Op::Enumerate { .. } => "enumerate",
            Op::Acquire { .. } => "acquire",
            Op::Release { .. } => "release",
            Op::Call { .. } => "call",
        }
    }
}

// ----------------------------------------------------------------------------
// Replies
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl Reply {
    pub fn ok(id: u64, value: Value) -> Self {
        Self {
            id,
            ok: Some(value),
            error: None,
        }
    }

    pub fn error(id: u64, error: RemoteError) -> Self {
        Self {
            id,
            ok: None,
            error: Some(error),
        }
    }

    /// An `error` wins over `ok`; a reply carrying neither means `null`
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.ok.unwrap_or(Value::Null)),
        }
    }
}

/// Failure reported by the peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Busy,
    NotFound,
    UnknownSession,
    InvalidSession,
    Timeout,
    Rejected,
    Device,
    Unsupported,
    /// Any code this side does not know
    #[serde(other)]
    Other,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Busy => "busy",
            ErrorCode::NotFound => "not_found",
            ErrorCode::UnknownSession => "unknown_session",
            ErrorCode::InvalidSession => "invalid_session",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Rejected => "rejected",
            ErrorCode::Device => "device",
            ErrorCode::Unsupported => "unsupported",
            ErrorCode::Other => "other",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Payloads
// ----------------------------------------------------------------------------

/// `info` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub name: String,
    pub version: String,
}

/// `acquire` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireReply {
    pub session: Session,
}
