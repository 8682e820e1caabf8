//! Codec Error Types

use thiserror::Error;

/// Errors raised while resolving wire names or encoding/decoding payloads.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The wire type name has no registered decoder.
    #[error("unknown wire type `{type_name}`")]
    UnknownType { type_name: String },

    /// No serializer is registered under this id.
    #[error("no serializer registered for id {id}")]
    UnknownSerializer { id: u32 },

    /// The message's concrete Rust type was never registered for transport.
    #[error("message type is not registered for wire transport")]
    UnregisteredType,

    /// The payload behind a registered name is not the registered type.
    #[error("payload does not match registered type for `{type_name}`")]
    TypeMismatch { type_name: String },

    #[error("failed to encode `{type_name}`: {source}")]
    Encode {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decode `{type_name}`: {source}")]
    Decode {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::UnknownType {
            type_name: type_name.into(),
        }
    }

    pub fn encode(
        type_name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Encode {
            type_name: type_name.into(),
            source: Box::new(source),
        }
    }

    pub fn decode(
        type_name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Decode {
            type_name: type_name.into(),
            source: Box::new(source),
        }
    }

    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType { .. })
    }

    /// Error category for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownType { .. } => "unknown_type",
            Self::UnknownSerializer { .. } => "unknown_serializer",
            Self::UnregisteredType => "unregistered_type",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Encode { .. } => "encode",
            Self::Decode { .. } => "decode",
        }
    }
}
