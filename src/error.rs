//! # Error Types
//!
//! Error handling for the wire protocol and connection engine.
//!
//! This module defines all error variants that can occur while talking to a
//! peer, from low-level I/O errors to protocol violations.
//!
//! ## Error Categories
//! - **I/O Errors**: socket failures
//! - **Decode Errors**: out-of-bounds reads, malformed headers, checksum mismatches
//! - **Request Errors**: timeouts, evictions, connection loss
//!
//! Insufficient buffered data is deliberately *not* an error: decoders that
//! can run ahead of the stream return `Ok(None)` and are retried once more
//! bytes arrive.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Decode errors
    pub const ERR_MALFORMED_LENGTH: &str = "Length prefix is negative or implausibly large";
    pub const ERR_EMPTY_APP_NAME: &str = "Handshake application name length is zero";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_NOT_CONNECTED: &str = "Connection is not ready";
}

/// Primary error type for all protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Position {position} is out of bounds, buffer ends at {len}")]
    OutOfBounds { position: i64, len: usize },

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: i32, computed: i32 },

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Request timed out")]
    Timeout,

    #[error("Request evicted before a reply arrived")]
    Cancelled,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection is not ready")]
    NotConnected,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Why a pending request settled without a reply.
///
/// Settlement outcomes are fanned out to every coalesced waiter, so the
/// failure cause is carried as a small copyable value and converted into a
/// [`ProtocolError`] at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFailure {
    /// No matching reply arrived inside the deadline.
    Timeout,
    /// Evicted from the pending table to make room for a newer request.
    Cancelled,
    /// The connection closed or errored while the request was outstanding.
    ConnectionClosed,
    /// The connection has not completed its handshake.
    NotConnected,
}

impl From<RequestFailure> for ProtocolError {
    fn from(failure: RequestFailure) -> Self {
        match failure {
            RequestFailure::Timeout => ProtocolError::Timeout,
            RequestFailure::Cancelled => ProtocolError::Cancelled,
            RequestFailure::ConnectionClosed => ProtocolError::ConnectionClosed,
            RequestFailure::NotConnected => ProtocolError::NotConnected,
        }
    }
}
