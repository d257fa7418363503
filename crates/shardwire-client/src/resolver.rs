//! Turn a transfer pointer into a live pull or push stream.

use crate::{ClientConfig, PullStream, PushSink, Session, TransferError};
use shardwire_core::{Operation, TransferPointer};

/// A resolved transfer, ready for reading or writing.
#[derive(Debug)]
pub enum TransferStream {
    Pull(PullStream),
    Push(PushSink),
}

impl TransferStream {
    pub fn operation(&self) -> Operation {
        match self {
            TransferStream::Pull(_) => Operation::Pull,
            TransferStream::Push(_) => Operation::Push,
        }
    }

    /// The connection backing this transfer.
    pub fn session(&self) -> &Session {
        match self {
            TransferStream::Pull(pull) => pull.session(),
            TransferStream::Push(push) => push.session(),
        }
    }
}

/// Opens one session per pointer and binds the matching adapter to it.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ClientConfig,
}

impl Resolver {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validate the pointer, connect to its farmer, and return the stream.
    ///
    /// Validation runs before any connection attempt. Connection failures
    /// are reported once through the returned error; anything after the
    /// session opens belongs to the stream.
    pub async fn resolve_stream(
        &self,
        pointer: &TransferPointer,
    ) -> Result<TransferStream, TransferError> {
        let session = self.open(pointer).await?;
        Ok(match pointer.operation() {
            Operation::Push => TransferStream::Push(PushSink::new(session, pointer)),
            Operation::Pull => TransferStream::Pull(PullStream::new(session, pointer)),
        })
    }

    /// Decode a JSON pointer and resolve it.
    pub async fn resolve_json(&self, json: &str) -> Result<TransferStream, TransferError> {
        let pointer = TransferPointer::from_json(json)?;
        self.resolve_stream(&pointer).await
    }

    /// Resolve a pointer that must be a pull.
    pub async fn pull(&self, pointer: &TransferPointer) -> Result<PullStream, TransferError> {
        expect_operation(pointer, Operation::Pull)?;
        let session = self.open(pointer).await?;
        Ok(PullStream::new(session, pointer))
    }

    /// Resolve a pointer that must be a push.
    pub async fn push(&self, pointer: &TransferPointer) -> Result<PushSink, TransferError> {
        expect_operation(pointer, Operation::Push)?;
        let session = self.open(pointer).await?;
        Ok(PushSink::new(session, pointer))
    }

    async fn open(&self, pointer: &TransferPointer) -> Result<Session, TransferError> {
        pointer.validate()?;

        let session = match Session::open(pointer.farmer(), &self.config).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Failed to reach farmer {}: {}", pointer.farmer(), e);
                return Err(e);
            }
        };

        tracing::debug!(
            "Resolved {} of shard {} via {}",
            pointer.operation(),
            pointer.hash(),
            session.url()
        );
        Ok(session)
    }
}

fn expect_operation(pointer: &TransferPointer, expected: Operation) -> Result<(), TransferError> {
    if pointer.operation() != expected {
        return Err(TransferError::WrongOperation {
            expected,
            actual: pointer.operation(),
        });
    }
    Ok(())
}

/// Resolve with the default configuration.
pub async fn resolve_stream(pointer: &TransferPointer) -> Result<TransferStream, TransferError> {
    Resolver::default().resolve_stream(pointer).await
}
