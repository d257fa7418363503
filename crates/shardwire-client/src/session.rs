//! One WebSocket connection to a farmer.

use crate::{ClientConfig, TransferError};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use shardwire_core::{Contact, ControlMessage, HandshakeMessage};
use std::fmt;
use std::future::poll_fn;
use std::task::{Context, Poll, ready};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message, error::ProtocolError};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle state.
///
/// Dialing is the pending [`Session::open`] future; a `Session` value only
/// exists once the connection is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// An inbound message, classified once at the connection boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Payload bytes. Never inspected.
    Binary(Bytes),
    /// A JSON status frame.
    Control(ControlMessage),
    /// A text frame that is not a valid control message.
    Malformed { raw: String, reason: String },
}

impl Frame {
    /// Classify raw bytes that are expected to hold a control message.
    pub fn control(raw: &[u8]) -> Self {
        match ControlMessage::decode(raw) {
            Ok(control) => Frame::Control(control),
            Err(e) => Frame::Malformed {
                raw: String::from_utf8_lossy(raw).into_owned(),
                reason: e.to_string(),
            },
        }
    }

    fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Binary(data) => Some(Frame::Binary(data)),
            Message::Text(text) => Some(Frame::control(text.as_bytes())),
            // Pings are answered by tungstenite; close is handled by the session.
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

/// Owns the connection for exactly one transfer.
///
/// Adapters take a `Session` by value, so a session can drive at most one
/// stream and is never shared.
pub struct Session {
    ws: WsStream,
    url: String,
    state: SessionState,
}

impl Session {
    /// Dial `ws://{address}:{port}`.
    ///
    /// Unreachable farmers and malformed addresses surface as
    /// [`TransferError::Connection`] from the returned future.
    pub async fn open(contact: &Contact, config: &ClientConfig) -> Result<Self, TransferError> {
        let url = contact.url();
        tracing::debug!("Connecting to farmer at {}", url);

        let connect = tokio_tungstenite::connect_async(url.as_str());
        let (ws, _response) = match config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| TransferError::ConnectTimeout(limit))??,
            None => connect.await?,
        };

        tracing::debug!("Connected to {}", url);
        Ok(Self {
            ws,
            url,
            state: SessionState::Open,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Send the JSON handshake as a text frame.
    pub async fn send_handshake(
        &mut self,
        handshake: &HandshakeMessage,
    ) -> Result<(), TransferError> {
        let json = handshake.to_json()?;
        self.send(Message::text(json)).await
    }

    /// Send one payload chunk as a binary frame.
    pub async fn send_binary(&mut self, chunk: Bytes) -> Result<(), TransferError> {
        self.send(Message::binary(chunk)).await
    }

    /// Resolves once the frame has been flushed to the socket.
    async fn send(&mut self, msg: Message) -> Result<(), TransferError> {
        if !self.is_open() {
            return Err(TransferError::PrematureTermination);
        }
        if let Err(e) = self.ws.send(msg).await {
            return Err(self.send_failed(e));
        }
        Ok(())
    }

    /// Queue the handshake without waiting for it to reach the socket.
    ///
    /// Once this returns `Ready(Ok(()))` the frame is owned by the
    /// connection; [`poll_flush`](Self::poll_flush) or any later send pushes
    /// it out.
    pub fn poll_queue_handshake(
        &mut self,
        cx: &mut Context<'_>,
        handshake: &HandshakeMessage,
    ) -> Poll<Result<(), TransferError>> {
        if !self.is_open() {
            return Poll::Ready(Err(TransferError::PrematureTermination));
        }
        if let Err(e) = ready!(self.ws.poll_ready_unpin(cx)) {
            return Poll::Ready(Err(self.send_failed(e)));
        }
        let json = handshake.to_json()?;
        if let Err(e) = self.ws.start_send_unpin(Message::text(json)) {
            return Poll::Ready(Err(self.send_failed(e)));
        }
        Poll::Ready(Ok(()))
    }

    /// Write out anything queued.
    ///
    /// A connection the farmer already closed is not an error here; the read
    /// side reports how it ended.
    pub fn poll_flush(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), TransferError>> {
        if !self.is_open() {
            return Poll::Ready(Ok(()));
        }
        match ready!(self.ws.poll_flush_unpin(cx)) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(e) if is_normal_close(&e) => Poll::Ready(Ok(())),
            Err(e) => Poll::Ready(Err(self.send_failed(e))),
        }
    }

    fn send_failed(&mut self, e: tungstenite::Error) -> TransferError {
        self.state = SessionState::Closed;
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransferError::PrematureTermination
            }
            e => e.into(),
        }
    }

    /// Next inbound frame, or `None` once the connection has closed.
    pub async fn recv(&mut self) -> Option<Result<Frame, TransferError>> {
        poll_fn(|cx| self.poll_recv(cx)).await
    }

    pub fn poll_recv(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame, TransferError>>> {
        if !self.is_open() {
            return Poll::Ready(None);
        }
        loop {
            let msg = match ready!(self.ws.poll_next_unpin(cx)) {
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("Farmer {} closed the connection: {:?}", self.url, frame);
                    self.state = SessionState::Closed;
                    return Poll::Ready(None);
                }
                Some(Ok(msg)) => msg,
                Some(Err(e)) if is_normal_close(&e) => {
                    tracing::debug!("Connection to {} ended", self.url);
                    self.state = SessionState::Closed;
                    return Poll::Ready(None);
                }
                None => {
                    tracing::debug!("Connection to {} ended", self.url);
                    self.state = SessionState::Closed;
                    return Poll::Ready(None);
                }
                Some(Err(e)) => {
                    self.state = SessionState::Closed;
                    return Poll::Ready(Some(Err(e.into())));
                }
            };
            if let Some(frame) = Frame::from_message(msg) {
                return Poll::Ready(Some(Ok(frame)));
            }
        }
    }

    /// Close the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        poll_fn(|cx| self.poll_close(cx)).await
    }

    pub fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.state = SessionState::Closed;
        match ready!(self.ws.poll_close_unpin(cx)) {
            Ok(()) => {}
            Err(e) if is_normal_close(&e) => {}
            Err(e) => tracing::debug!("Error closing connection to {}: {}", self.url, e),
        }
        Poll::Ready(())
    }
}

/// Errors that only mean the connection is already gone.
fn is_normal_close(e: &tungstenite::Error) -> bool {
    matches!(
        e,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frames_are_control_messages() {
        let text = r#"{"code":404,"message":"not found"}"#.to_string();
        let frame = Frame::from_message(Message::text(text));
        assert_eq!(
            frame,
            Some(Frame::Control(ControlMessage::error(404, "not found")))
        );
    }

    #[test]
    fn binary_frames_are_never_parsed() {
        let frame = Frame::from_message(Message::binary(br#"{"code":500}"#.to_vec()));
        assert_eq!(frame, Some(Frame::Binary(Bytes::from_static(br#"{"code":500}"#))));
    }

    #[test]
    fn garbage_text_is_malformed() {
        match Frame::from_message(Message::text("<html>".to_string())) {
            Some(Frame::Malformed { raw, .. }) => assert_eq!(raw, "<html>"),
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn pings_are_skipped() {
        assert_eq!(Frame::from_message(Message::Ping(Bytes::new())), None);
    }
}
