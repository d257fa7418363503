//! Core types for shardwire.
//!
//! This crate provides the value types a transfer is described by and the
//! JSON messages exchanged before and after the binary payload. It performs no
//! I/O; `shardwire-client` drives the connection.

mod contact;
mod message;
mod pointer;

pub use contact::{Contact, ValidationError};
pub use message::{ControlMessage, HandshakeMessage, STATUS_OK};
pub use pointer::{Operation, TransferPointer};
