//! Transfer pointers issued by farmers.

use crate::contact::RawContact;
use crate::{Contact, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transfer, from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Retrieve a shard from the farmer.
    Pull,
    /// Deliver a shard to the farmer.
    Push,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Pull => f.write_str("PULL"),
            Operation::Push => f.write_str("PUSH"),
        }
    }
}

/// One authorized transfer: where to connect, which capability to present,
/// which shard, and in which direction.
///
/// Produced elsewhere (usually decoded from JSON) and consumed once by the
/// resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPointer")]
pub struct TransferPointer {
    farmer: Contact,
    token: String,
    hash: String,
    operation: Operation,
}

#[derive(Deserialize)]
struct RawPointer {
    farmer: RawContact,
    token: String,
    hash: String,
    operation: Operation,
}

impl TransferPointer {
    pub fn new(
        farmer: Contact,
        token: impl Into<String>,
        hash: impl Into<String>,
        operation: Operation,
    ) -> Result<Self, ValidationError> {
        let pointer = Self {
            farmer,
            token: token.into(),
            hash: hash.into(),
            operation,
        };
        pointer.validate()?;
        Ok(pointer)
    }

    /// Decode a pointer from its JSON form.
    ///
    /// Structural problems (bad JSON, missing fields) are
    /// [`ValidationError::Malformed`]; well-formed JSON with bad values
    /// reports the specific variant.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let raw: RawPointer =
            serde_json::from_str(json).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    /// Check that the pointer can be used for a transfer.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token.is_empty() {
            return Err(ValidationError::EmptyToken);
        }
        if self.hash.is_empty() {
            return Err(ValidationError::EmptyHash);
        }
        Ok(())
    }

    pub fn farmer(&self) -> &Contact {
        &self.farmer
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl TryFrom<RawPointer> for TransferPointer {
    type Error = ValidationError;

    fn try_from(raw: RawPointer) -> Result<Self, Self::Error> {
        Self::new(Contact::try_from(raw.farmer)?, raw.token, raw.hash, raw.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PULL_JSON: &str = r#"{
        "farmer": {"address": "127.0.0.1", "port": 4001},
        "token": "tok",
        "hash": "fd2b0d6b3f8a0c2e7e1b",
        "operation": "PULL"
    }"#;

    #[test]
    fn parse_pointer() {
        let pointer = TransferPointer::from_json(PULL_JSON).unwrap();
        assert_eq!(pointer.operation(), Operation::Pull);
        assert_eq!(pointer.farmer().url(), "ws://127.0.0.1:4001");
        assert_eq!(pointer.token(), "tok");
    }

    #[test]
    fn missing_port_is_malformed() {
        let json = r#"{"farmer":{"address":"127.0.0.1"},"token":"t","hash":"h","operation":"PUSH"}"#;
        let err = TransferPointer::from_json(json).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(ref m) if m.contains("port")));
    }

    #[test]
    fn unknown_operation_is_malformed() {
        let json = r#"{"farmer":{"address":"h","port":1},"token":"t","hash":"h","operation":"PEEK"}"#;
        assert!(matches!(
            TransferPointer::from_json(json),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn from_json_keeps_value_errors() {
        let empty_token =
            r#"{"farmer":{"address":"h","port":1},"token":"","hash":"h","operation":"PULL"}"#;
        assert_eq!(
            TransferPointer::from_json(empty_token),
            Err(ValidationError::EmptyToken)
        );

        let empty_hash =
            r#"{"farmer":{"address":"h","port":1},"token":"t","hash":"","operation":"PUSH"}"#;
        assert_eq!(
            TransferPointer::from_json(empty_hash),
            Err(ValidationError::EmptyHash)
        );

        let port_zero =
            r#"{"farmer":{"address":"h","port":0},"token":"t","hash":"h","operation":"PULL"}"#;
        assert_eq!(
            TransferPointer::from_json(port_zero),
            Err(ValidationError::InvalidPort(0))
        );
    }

    #[test]
    fn serde_still_validates() {
        let json = r#"{"farmer":{"address":"h","port":1},"token":"","hash":"h","operation":"PULL"}"#;
        assert!(serde_json::from_str::<TransferPointer>(json).is_err());
    }

    #[test]
    fn empty_token_rejected() {
        let farmer = Contact::new("h", 1).unwrap();
        assert_eq!(
            TransferPointer::new(farmer, "", "abc", Operation::Pull),
            Err(ValidationError::EmptyToken)
        );
    }
}
