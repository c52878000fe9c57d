//! Wire types spoken by the bridge daemon
//!
//! Shared with test doubles so a fake daemon answers with exactly the shapes
//! the backend parses.

use hwtransport_core::{Message, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub version: String,
    #[serde(default)]
    pub configured: bool,
}

/// `POST /acquire/{path}` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireReply {
    pub session: Session,
}

/// Body of `POST /call/{session}` and its reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub message: Value,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        Self {
            name: message.name,
            message: message.data,
        }
    }
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        match wire.message {
            Value::Null => Message::empty(wire.name),
            data => Message::new(wire.name, data),
        }
    }
}

/// Error reply for any endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
