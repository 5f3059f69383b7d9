// src/ami/mod.rs
//! Asterisk Manager Interface session: framed decoding, login handshake,
//! and the reconnecting client that fans events out to the correlator.

pub mod client;
pub mod codec;
pub mod connection;
pub mod event;

pub use client::{AmiClient, ReconnectHandle, SessionState};
pub use codec::AmiCodec;
pub use connection::AmiConnection;
pub use event::RawEvent;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Explicit credential rejection by the manager. Never retried.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Login handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Missing field: {0}")]
    MissingField(String),
}
