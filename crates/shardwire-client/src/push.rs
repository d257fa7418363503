//! Push adapter: deliver a shard to a farmer chunk by chunk.

use crate::{Frame, Session, TransferError};
use bytes::Bytes;
use futures_util::FutureExt;
use shardwire_core::{ControlMessage, HandshakeMessage, TransferPointer};

/// Push lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Nothing sent yet.
    Unauthenticated,
    /// Handshake being flushed; no payload may go out.
    Authenticating,
    /// Handshake flushed; payload frames flow.
    Streaming,
    /// The farmer accepted the shard.
    Closed,
    /// Rejected, failed or aborted.
    Errored,
}

/// Writable side of a transfer.
///
/// Each [`write`](Self::write) resolves only after its frame has been flushed,
/// so at most one chunk is in flight. The first write sends the handshake and
/// waits for its flush before any payload. The farmer's first reply, whenever
/// it arrives, ends the transfer.
#[derive(Debug)]
pub struct PushSink {
    session: Session,
    handshake: HandshakeMessage,
    state: PushState,
}

impl PushSink {
    pub(crate) fn new(session: Session, pointer: &TransferPointer) -> Self {
        Self {
            session,
            handshake: HandshakeMessage::for_pointer(pointer),
            state: PushState::Unauthenticated,
        }
    }

    pub fn state(&self) -> PushState {
        self.state
    }

    /// The underlying connection, for inspection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Force-close the connection. Later writes fail with
    /// [`TransferError::PrematureTermination`].
    pub async fn abort(&mut self) {
        self.session.close().await;
        if self.state != PushState::Closed {
            self.state = PushState::Errored;
        }
    }

    /// Send one chunk as a binary frame.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), TransferError> {
        // A reply that already arrived ends the transfer before this chunk.
        if let Some(Some(reply)) = self.session.recv().now_or_never() {
            self.on_reply(reply).await?;
        }
        if !self.session.is_open() {
            return Err(TransferError::PrematureTermination);
        }

        match self.state {
            PushState::Unauthenticated => self.authenticate().await?,
            PushState::Streaming => {}
            // A cancelled write left the handshake half sent.
            PushState::Authenticating | PushState::Closed | PushState::Errored => {
                return Err(TransferError::PrematureTermination);
            }
        }

        let chunk = chunk.into();
        let len = chunk.len();
        match self.session.send_binary(chunk).await {
            Ok(()) => {
                tracing::trace!("Pushed {} bytes of shard {}", len, self.handshake.hash);
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Finish the push and wait for the farmer's verdict.
    ///
    /// An empty shard still sends the handshake. The session is closed on
    /// return.
    pub async fn finish(mut self) -> Result<(), TransferError> {
        match self.state {
            PushState::Unauthenticated => {
                if !self.session.is_open() {
                    return Err(TransferError::PrematureTermination);
                }
                self.authenticate().await?;
            }
            PushState::Streaming => {}
            PushState::Closed => return Ok(()),
            PushState::Authenticating | PushState::Errored => {
                return Err(TransferError::PrematureTermination);
            }
        }

        match self.session.recv().await {
            Some(reply) => self.on_reply(reply).await,
            None => Err(self.fail(TransferError::PrematureTermination).await),
        }
    }

    async fn authenticate(&mut self) -> Result<(), TransferError> {
        self.state = PushState::Authenticating;
        if let Err(e) = self.session.send_handshake(&self.handshake).await {
            return Err(self.fail(e).await);
        }
        tracing::debug!(
            "Push handshake sent to {} for shard {}",
            self.session.url(),
            self.handshake.hash
        );
        self.state = PushState::Streaming;
        Ok(())
    }

    /// Any inbound message is the farmer's single, terminal reply.
    async fn on_reply(
        &mut self,
        reply: Result<Frame, TransferError>,
    ) -> Result<(), TransferError> {
        let outcome = match reply {
            Ok(Frame::Control(control)) => TransferError::check_control(control),
            Ok(Frame::Binary(raw)) => ControlMessage::decode(&raw)
                .map_err(|e| TransferError::Decoding {
                    reason: e.to_string(),
                })
                .and_then(TransferError::check_control),
            Ok(Frame::Malformed { reason, .. }) => Err(TransferError::Decoding { reason }),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::debug!("Farmer accepted shard {}", self.handshake.hash);
                self.session.close().await;
                self.state = PushState::Closed;
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    async fn fail(&mut self, e: TransferError) -> TransferError {
        tracing::warn!("Push of shard {} failed: {}", self.handshake.hash, e);
        self.session.close().await;
        self.state = PushState::Errored;
        e
    }
}
