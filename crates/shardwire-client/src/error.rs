//! Transfer errors.

use shardwire_core::{ControlMessage, Operation, ValidationError};
use std::time::Duration;
use tokio_tungstenite::tungstenite;

/// Everything that can end a transfer early.
///
/// Errors are scoped to one transfer; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The pointer or contact is not well formed. Raised before any I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The farmer could not be reached, or the transport failed.
    #[error("connection error: {0}")]
    Connection(#[from] tungstenite::Error),

    #[error("timed out connecting to farmer after {0:?}")]
    ConnectTimeout(Duration),

    /// A control frame that is not valid JSON.
    #[error("failed to decode control message: {reason}")]
    Decoding { reason: String },

    /// The farmer reported a non-200 status.
    #[error("farmer returned {code}: {message}")]
    Protocol { code: i64, message: String },

    /// Data was offered after the connection stopped being open, or the
    /// farmer hung up without a reply.
    #[error("remote host terminated early")]
    PrematureTermination,

    #[error("pointer is for {actual}, expected {expected}")]
    WrongOperation {
        expected: Operation,
        actual: Operation,
    },

    #[error("failed to encode handshake: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl TransferError {
    /// Turn a farmer's status frame into the transfer outcome it reports.
    pub(crate) fn check_control(control: ControlMessage) -> Result<(), TransferError> {
        if control.is_success() {
            return Ok(());
        }
        Err(TransferError::Protocol {
            code: control.code.unwrap_or_default(),
            message: control.message,
        })
    }
}
