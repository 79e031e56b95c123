//! # Error Types
//!
//! Error handling for the basket-purchase protocol client.
//!
//! This module defines every failure class the client can surface, from
//! low-level I/O errors to protocol violations observed on the wire.
//!
//! ## Error Categories
//! - **I/O errors**: dial, write, and read failures on the TCP connection
//! - **Configuration errors**: rejected before any network activity
//! - **Handshake errors**: fatal to session construction, never recoverable
//! - **Framing errors**: frames that are too short, too large, or unterminated
//!
//! An unrecognized command identifier is deliberately *not* an error: the
//! dispatcher classifies and logs it, then keeps running. See
//! [`crate::protocol::dispatcher`].

use std::io;
use thiserror::Error;

use crate::core::message::Status;

/// Primary error type for all client operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("authentication rejected by server: status {0}")]
    AuthRejected(Status),

    #[error("expected a response frame, got command {0}")]
    UnexpectedFrame(u16),

    #[error("frame too short: need {need} bytes, got {got}")]
    ShortFrame { need: usize, got: usize },

    #[error("frame exceeds maximum size of {max} bytes")]
    OversizedFrame { max: usize },

    #[error("connection closed by peer")]
    ConnectionClosed,
}

/// Type alias for Results using `ProtocolError`.
pub type Result<T> = std::result::Result<T, ProtocolError>;
