//! Client side of the shardwire protocol.
//!
//! A transfer runs over one WebSocket connection to a farmer. The client sends
//! a JSON handshake, then either receives the shard as binary frames
//! ([`PullStream`]) or sends it as binary frames ([`PushSink`]). A single JSON
//! control frame from the farmer reports failure (pull) or the final outcome
//! (push).
//!
//! ```ignore
//! let resolver = Resolver::new(ClientConfig::default());
//! let pointer = TransferPointer::from_json(&json)?;
//! let mut pull = resolver.pull(&pointer).await?;
//! while let Some(chunk) = pull.next_chunk().await {
//!     out.extend_from_slice(&chunk?);
//! }
//! ```
//!
//! There is no retry, reconnection or default timeout. A farmer that never
//! replies keeps the transfer pending until the caller drops or aborts it;
//! [`ClientConfig::connect_timeout_secs`] bounds only the dial.
//!
//! Pull reads may be dropped and retried; the handshake is sent exactly once.
//! A push `write` dropped mid-handshake leaves the sink unusable.

mod config;
mod error;
mod pull;
mod push;
mod resolver;
mod session;

pub use config::{ClientConfig, ConfigError};
pub use error::TransferError;
pub use pull::{PullState, PullStream};
pub use push::{PushState, PushSink};
pub use resolver::{Resolver, TransferStream, resolve_stream};
pub use session::{Frame, Session, SessionState};

pub use shardwire_core::{
    Contact, ControlMessage, HandshakeMessage, Operation, TransferPointer, ValidationError,
};
