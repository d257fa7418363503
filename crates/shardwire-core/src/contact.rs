//! Farmer contact information.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network location of a farmer.
///
/// Always holds a non-blank address and a port in `1..=65535`; both the
/// constructor and deserialization enforce this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawContact")]
pub struct Contact {
    address: String,
    port: u16,
}

/// Contact fields as they appear on the wire, before validation.
#[derive(Deserialize)]
pub(crate) struct RawContact {
    address: String,
    port: u64,
}

impl Contact {
    /// Create a contact, rejecting blank addresses and port 0.
    pub fn new(address: impl Into<String>, port: u16) -> Result<Self, ValidationError> {
        Self::checked(address.into(), u64::from(port))
    }

    fn checked(address: String, port: u64) -> Result<Self, ValidationError> {
        if address.trim().is_empty() {
            return Err(ValidationError::EmptyAddress);
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ValidationError::InvalidPort(port))?;
        Ok(Self { address, port })
    }

    /// The address as supplied (may carry surrounding whitespace).
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// WebSocket endpoint for this farmer: `ws://{address}:{port}`, no path.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.address.trim(), self.port)
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address.trim(), self.port)
    }
}

impl TryFrom<RawContact> for Contact {
    type Error = ValidationError;

    fn try_from(raw: RawContact) -> Result<Self, Self::Error> {
        Self::checked(raw.address, raw.port)
    }
}

/// A contact or transfer pointer that is not well formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("farmer address cannot be empty")]
    EmptyAddress,
    #[error("farmer port must be in 1..=65535, got {0}")]
    InvalidPort(u64),
    #[error("transfer token cannot be empty")]
    EmptyToken,
    #[error("shard hash cannot be empty")]
    EmptyHash,
    #[error("malformed transfer pointer: {0}")]
    Malformed(String),
}
