//! Wire Type Table
//!
//! Maps wire type names to monomorphized encode/decode functions and maps
//! concrete Rust types back to their wire names. The table is append-only
//! after setup; registration is idempotent and lookups clone a shared entry
//! so the lock is never held across an await point.

use crate::error::{CodecError, Result};
use lattice_types::DynMessage;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

type EncodeBinaryFn = fn(&DynMessage, &str) -> Result<Vec<u8>>;
type DecodeBinaryFn = fn(&[u8], &str) -> Result<DynMessage>;
type EncodeJsonFn = fn(&DynMessage, &str) -> Result<String>;
type DecodeJsonFn = fn(&str, &str) -> Result<DynMessage>;

/// One registered wire type: its name and codec entry points.
#[derive(Debug)]
pub struct TypeEntry {
    pub name: String,
    pub(crate) type_id: TypeId,
    pub(crate) encode_binary: EncodeBinaryFn,
    pub(crate) decode_binary: DecodeBinaryFn,
    pub(crate) encode_json: EncodeJsonFn,
    pub(crate) decode_json: DecodeJsonFn,
}

fn encode_binary<T: Serialize + Send + Sync + 'static>(
    message: &DynMessage,
    name: &str,
) -> Result<Vec<u8>> {
    let value = message
        .downcast_ref::<T>()
        .ok_or_else(|| CodecError::TypeMismatch {
            type_name: name.to_string(),
        })?;
    bincode::serialize(value).map_err(|e| CodecError::encode(name, e))
}

fn decode_binary<T: DeserializeOwned + Send + Sync + 'static>(
    data: &[u8],
    name: &str,
) -> Result<DynMessage> {
    let value: T = bincode::deserialize(data).map_err(|e| CodecError::decode(name, e))?;
    Ok(Arc::new(value))
}

fn encode_json<T: Serialize + Send + Sync + 'static>(
    message: &DynMessage,
    name: &str,
) -> Result<String> {
    let value = message
        .downcast_ref::<T>()
        .ok_or_else(|| CodecError::TypeMismatch {
            type_name: name.to_string(),
        })?;
    serde_json::to_string(value).map_err(|e| CodecError::encode(name, e))
}

fn decode_json<T: DeserializeOwned + Send + Sync + 'static>(
    body: &str,
    name: &str,
) -> Result<DynMessage> {
    let value: T = serde_json::from_str(body).map_err(|e| CodecError::decode(name, e))?;
    Ok(Arc::new(value))
}

#[derive(Default)]
struct TableInner {
    by_name: HashMap<String, Arc<TypeEntry>>,
    names_by_type: HashMap<TypeId, String>,
}

/// Registry of wire type names and their codecs.
#[derive(Default)]
pub struct TypeTable {
    inner: RwLock<TableInner>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`. Returns `false` if the name was already
    /// registered (the existing entry wins).
    pub fn register<T>(&self, name: &str) -> bool
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(name) {
            return false;
        }
        let entry = Arc::new(TypeEntry {
            name: name.to_string(),
            type_id: TypeId::of::<T>(),
            encode_binary: encode_binary::<T>,
            decode_binary: decode_binary::<T>,
            encode_json: encode_json::<T>,
            decode_json: decode_json::<T>,
        });
        inner.names_by_type.insert(TypeId::of::<T>(), name.to_string());
        inner.by_name.insert(name.to_string(), entry);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    pub fn entry(&self, name: &str) -> Result<Arc<TypeEntry>> {
        self.inner
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| CodecError::unknown_type(name))
    }

    /// Wire name of the message's concrete type.
    pub fn name_of(&self, message: &DynMessage) -> Result<String> {
        self.inner
            .read()
            .names_by_type
            .get(&message.as_ref().type_id())
            .cloned()
            .ok_or(CodecError::UnregisteredType)
    }
}
