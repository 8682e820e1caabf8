//! JSON Codec (serializer id 1)
//!
//! Two forms are accepted on the serialize side: a registered concrete type,
//! encoded via serde_json, or a [`JsonMessage`] wrapper that already carries
//! its wire type name and body. Deserialization always goes through the type
//! table so the result is the concrete registered type, not the wrapper.

use crate::error::{CodecError, Result};
use crate::serializer::{SerializedMessage, Serializer};
use crate::table::TypeTable;
use lattice_types::DynMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A JSON payload tagged with the wire type name it should decode as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMessage {
    pub type_name: String,
    pub body: String,
}

impl JsonMessage {
    pub fn new(type_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            body: body.into(),
        }
    }
}

pub struct JsonSerializer {
    types: Arc<TypeTable>,
}

impl JsonSerializer {
    pub fn new(types: Arc<TypeTable>) -> Self {
        Self { types }
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, message: &DynMessage) -> Result<SerializedMessage> {
        if let Some(wrapper) = message.downcast_ref::<JsonMessage>() {
            return Ok(SerializedMessage {
                type_name: wrapper.type_name.clone(),
                data: wrapper.body.clone().into_bytes(),
            });
        }
        let name = self.types.name_of(message)?;
        let entry = self.types.entry(&name)?;
        let body = (entry.encode_json)(message, &name)?;
        Ok(SerializedMessage {
            type_name: name,
            data: body.into_bytes(),
        })
    }

    fn deserialize(&self, type_name: &str, data: &[u8]) -> Result<DynMessage> {
        let entry = self.types.entry(type_name)?;
        let body = std::str::from_utf8(data).map_err(|e| CodecError::decode(type_name, e))?;
        (entry.decode_json)(body, type_name)
    }

    fn type_name(&self, message: &DynMessage) -> Result<String> {
        if let Some(wrapper) = message.downcast_ref::<JsonMessage>() {
            return Ok(wrapper.type_name.clone());
        }
        self.types.name_of(message)
    }
}
