//! Protocol error module.
//!
//! This module defines error types that may occur while decoding requests
//! from the line protocol.

use thiserror::Error;

/// Errors that can occur during protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The line is not a valid request object.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The line exceeds the maximum allowed size.
    #[error("Message size exceeds maximum allowed: {size} > {max_size}")]
    MessageTooLarge {
        /// The actual size of the message in bytes
        size: usize,
        /// The maximum allowed size in bytes
        max_size: usize,
    },

    /// Reading from or writing to the transport failed.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl ProtocolError {
    /// Short machine-readable name of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::MessageTooLarge { .. } => "message_too_large",
            Self::Transport(_) => "transport",
        }
    }
}
