//! Remote Error Types

use lattice_codec::CodecError;
use thiserror::Error;

/// Errors raised by the remote subsystem.
#[derive(Error, Debug)]
pub enum NetError {
    /// The peer cannot be reached right now; retry policy applies.
    #[error("peer unavailable at {address}: {message}")]
    Unavailable { address: String, message: String },

    /// A frame violated the wire protocol (oversize, truncated, undecodable).
    #[error("frame error: {message}")]
    Frame { message: String },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote subsystem failed to start.
    #[error("remote start failed: {message}")]
    Start { message: String },
}

/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    pub fn unavailable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn start(message: impl Into<String>) -> Self {
        Self::Start {
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Error category for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Frame { .. } => "frame",
            Self::Codec(_) => "codec",
            Self::Io { .. } => "io",
            Self::Start { .. } => "start",
        }
    }
}
