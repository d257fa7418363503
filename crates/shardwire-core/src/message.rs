//! JSON messages exchanged around the binary payload.

use crate::{Operation, TransferPointer};
use serde::{Deserialize, Serialize};

/// Status code a farmer uses to report success.
pub const STATUS_OK: i64 = 200;

/// First message on every connection, authorizing exactly one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    pub token: String,
    pub hash: String,
    pub operation: Operation,
}

impl HandshakeMessage {
    pub fn for_pointer(pointer: &TransferPointer) -> Self {
        Self {
            token: pointer.token().to_string(),
            hash: pointer.hash().to_string(),
            operation: pointer.operation(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Terminal status frame sent by a farmer.
///
/// A missing `code` counts as success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl ControlMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: Some(STATUS_OK),
            message: message.into(),
        }
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn decode(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    pub fn is_success(&self) -> bool {
        self.code.is_none_or(|code| code == STATUS_OK)
    }
}
