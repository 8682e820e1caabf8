//! Serializer Interface
//!
//! A serializer turns a dynamically-typed message into `(wire name, bytes)`
//! and back. Ids 0 and 1 are built in; ids 2 and above are reserved for
//! user-registered serializers.

use crate::error::Result;
use lattice_types::DynMessage;

/// Binary codec over the registered type table.
pub const SERIALIZER_ID_BINARY: u32 = 0;
/// JSON codec with explicit type names.
pub const SERIALIZER_ID_JSON: u32 = 1;

/// A serialized payload tagged with its wire type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedMessage {
    pub type_name: String,
    pub data: Vec<u8>,
}

/// One entry in the registry's indexed serializer list.
pub trait Serializer: Send + Sync {
    fn serialize(&self, message: &DynMessage) -> Result<SerializedMessage>;

    fn deserialize(&self, type_name: &str, data: &[u8]) -> Result<DynMessage>;

    /// Wire type name this serializer would tag `message` with.
    fn type_name(&self, message: &DynMessage) -> Result<String>;
}
