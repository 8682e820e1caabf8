//! Serialization Registry
//!
//! Resolves wire type names to concrete message decoders and back. Two
//! codecs are built in: bincode under serializer id 0 and JSON under id 1,
//! the latter accepting a [`JsonMessage`] wrapper that names its own wire
//! type. Ids 2 and above are open for user-registered serializers.
//!
//! Types become decodable by registering them, individually or through a
//! [`TypeManifest`]; the runtime's control types are pre-registered by
//! [`SerializerRegistry::new`].

pub mod binary;
pub mod error;
pub mod json;
pub mod manifest;
pub mod registry;
pub mod serializer;
pub mod table;

pub use binary::BinarySerializer;
pub use error::{CodecError, Result};
pub use json::{JsonMessage, JsonSerializer};
pub use manifest::TypeManifest;
pub use registry::SerializerRegistry;
pub use serializer::{
    SerializedMessage, Serializer, SERIALIZER_ID_BINARY, SERIALIZER_ID_JSON,
};
pub use table::TypeTable;
