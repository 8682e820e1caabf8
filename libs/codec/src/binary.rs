//! Binary Codec (serializer id 0)
//!
//! Encodes registered types with bincode. The wire name comes from the type
//! table; a message whose concrete type was never registered cannot travel
//! in binary form.

use crate::error::Result;
use crate::serializer::{SerializedMessage, Serializer};
use crate::table::TypeTable;
use lattice_types::DynMessage;
use std::sync::Arc;

pub struct BinarySerializer {
    types: Arc<TypeTable>,
}

impl BinarySerializer {
    pub fn new(types: Arc<TypeTable>) -> Self {
        Self { types }
    }
}

impl Serializer for BinarySerializer {
    fn serialize(&self, message: &DynMessage) -> Result<SerializedMessage> {
        let name = self.types.name_of(message)?;
        let entry = self.types.entry(&name)?;
        let data = (entry.encode_binary)(message, &name)?;
        Ok(SerializedMessage {
            type_name: name,
            data,
        })
    }

    fn deserialize(&self, type_name: &str, data: &[u8]) -> Result<DynMessage> {
        let entry = self.types.entry(type_name)?;
        (entry.decode_binary)(data, type_name)
    }

    fn type_name(&self, message: &DynMessage) -> Result<String> {
        self.types.name_of(message)
    }
}
