//! Pull adapter: a farmer's shard as a stream of byte chunks.

use crate::{Frame, Session, TransferError};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use shardwire_core::{HandshakeMessage, TransferPointer};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Pull lifecycle.
///
/// ```text
/// Unauthenticated --read--> Authenticating --binary--> Streaming --close--> Closed
///        |                        |                        |
///        +------ error / control frame -----> Closing ---> Closed | Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    /// Nothing sent yet.
    Unauthenticated,
    /// Handshake queued on the connection. The farmer does not acknowledge it.
    Authenticating,
    /// At least one payload frame received.
    Streaming,
    /// A terminal frame or error arrived; the session is being closed.
    Closing,
    /// The connection is closed; the shard is complete.
    Closed,
    /// An error was reported; no more data will be produced.
    Errored,
}

/// Readable side of a transfer.
///
/// A [`Stream`] of chunks. The handshake goes out on the first poll. Every
/// binary frame is yielded as-is and in order; the stream ends when the
/// farmer closes the connection. A text frame is always terminal: it is
/// reported as an error unless it carries a success code, and the session is
/// closed either way.
#[derive(Debug)]
pub struct PullStream {
    session: Session,
    handshake: HandshakeMessage,
    state: PullState,
    /// Error to yield once `Closing` finishes.
    pending: Option<TransferError>,
}

impl PullStream {
    pub(crate) fn new(session: Session, pointer: &TransferPointer) -> Self {
        Self {
            session,
            handshake: HandshakeMessage::for_pointer(pointer),
            state: PullState::Unauthenticated,
            pending: None,
        }
    }

    pub fn state(&self) -> PullState {
        self.state
    }

    /// The underlying connection, for inspection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Force-close the connection. Later reads return `None`.
    pub async fn abort(&mut self) {
        self.session.close().await;
        self.pending = None;
        if self.state != PullState::Errored {
            self.state = PullState::Closed;
        }
    }

    /// Read the next chunk.
    ///
    /// Returns `None` at end of shard, and after an error has been returned
    /// once. Cancel safe: dropping the future never loses or repeats the
    /// handshake.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, TransferError>> {
        self.next().await
    }

    /// Collect the whole shard.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, TransferError> {
        let mut shard = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            shard.extend_from_slice(&chunk?);
        }
        Ok(shard)
    }

    fn on_frame(&mut self, frame: Frame) -> Option<Bytes> {
        match frame {
            Frame::Binary(chunk) => {
                self.state = PullState::Streaming;
                return Some(chunk);
            }
            Frame::Control(control) => {
                if let Err(e) = TransferError::check_control(control) {
                    self.begin_failure(e);
                } else {
                    self.state = PullState::Closing;
                }
            }
            Frame::Malformed { raw, reason } => {
                tracing::warn!(
                    "Undecodable control frame from {}: {:?}",
                    self.session.url(),
                    raw
                );
                self.begin_failure(TransferError::Decoding { reason });
            }
        }
        None
    }

    fn begin_failure(&mut self, e: TransferError) {
        tracing::warn!("Pull of shard {} failed: {}", self.handshake.hash, e);
        self.pending = Some(e);
        self.state = PullState::Closing;
    }
}

impl Stream for PullStream {
    type Item = Result<Bytes, TransferError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.state {
                PullState::Unauthenticated => {
                    // Only advance once the frame is queued, so a dropped
                    // read neither loses nor repeats the handshake.
                    match ready!(this.session.poll_queue_handshake(cx, &this.handshake)) {
                        Ok(()) => {
                            this.state = PullState::Authenticating;
                            tracing::debug!(
                                "Pull handshake sent to {} for shard {}",
                                this.session.url(),
                                this.handshake.hash
                            );
                        }
                        Err(e) => this.begin_failure(e),
                    }
                }
                PullState::Authenticating | PullState::Streaming => {
                    // Reading does not wait for the flush.
                    if let Poll::Ready(Err(e)) = this.session.poll_flush(cx) {
                        this.begin_failure(e);
                        continue;
                    }
                    match ready!(this.session.poll_recv(cx)) {
                        Some(Ok(frame)) => {
                            if let Some(chunk) = this.on_frame(frame) {
                                return Poll::Ready(Some(Ok(chunk)));
                            }
                        }
                        Some(Err(e)) => this.begin_failure(e),
                        None => {
                            tracing::debug!("Pull of shard {} complete", this.handshake.hash);
                            this.state = PullState::Closed;
                            return Poll::Ready(None);
                        }
                    }
                }
                PullState::Closing => {
                    ready!(this.session.poll_close(cx));
                    return Poll::Ready(match this.pending.take() {
                        Some(e) => {
                            this.state = PullState::Errored;
                            Some(Err(e))
                        }
                        None => {
                            this.state = PullState::Closed;
                            None
                        }
                    });
                }
                PullState::Closed | PullState::Errored => return Poll::Ready(None),
            }
        }
    }
}
