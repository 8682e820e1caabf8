//! Serializer Registry
//!
//! The registry owns the wire type table and the indexed serializer list.
//! It pre-registers the runtime's control types so pids, watch traffic, and
//! remote-spawn requests are decodable on every node without setup.

use crate::binary::BinarySerializer;
use crate::error::{CodecError, Result};
use crate::json::{JsonMessage, JsonSerializer};
use crate::manifest::TypeManifest;
use crate::serializer::{
    SerializedMessage, Serializer, SERIALIZER_ID_BINARY, SERIALIZER_ID_JSON,
};
use crate::table::TypeTable;
use lattice_types::{
    ActorPidRequest, ActorPidResponse, DynMessage, Pid, StopActor, Terminated, Unwatch, Watch,
    WIRE_ACTOR_PID_REQUEST, WIRE_ACTOR_PID_RESPONSE, WIRE_PID, WIRE_STOP, WIRE_TERMINATED,
    WIRE_UNWATCH, WIRE_WATCH,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Resolves wire type names to decoders and back, across all serializer ids.
pub struct SerializerRegistry {
    types: Arc<TypeTable>,
    serializers: RwLock<Vec<Arc<dyn Serializer>>>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        let types = Arc::new(TypeTable::new());
        let serializers: Vec<Arc<dyn Serializer>> = vec![
            Arc::new(BinarySerializer::new(types.clone())),
            Arc::new(JsonSerializer::new(types.clone())),
        ];
        let registry = Self {
            types,
            serializers: RwLock::new(serializers),
        };
        registry.register_builtin_types();
        registry
    }

    fn register_builtin_types(&self) {
        self.types.register::<Pid>(WIRE_PID);
        self.types.register::<Watch>(WIRE_WATCH);
        self.types.register::<Unwatch>(WIRE_UNWATCH);
        self.types.register::<Terminated>(WIRE_TERMINATED);
        self.types.register::<StopActor>(WIRE_STOP);
        self.types.register::<ActorPidRequest>(WIRE_ACTOR_PID_REQUEST);
        self.types.register::<ActorPidResponse>(WIRE_ACTOR_PID_RESPONSE);
    }

    /// Register `T` under `name`; `false` when the name already existed.
    pub fn register_type<T>(&self, name: &str) -> bool
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.types.register::<T>(name)
    }

    /// Merge a manifest of registrations; returns how many were new.
    pub fn register_manifest(&self, manifest: &TypeManifest) -> usize {
        manifest.apply(&self.types)
    }

    /// Append a user serializer; returns its id (2+).
    pub fn add_serializer(&self, serializer: Arc<dyn Serializer>) -> u32 {
        let mut serializers = self.serializers.write();
        serializers.push(serializer);
        (serializers.len() - 1) as u32
    }

    fn serializer(&self, id: u32) -> Result<Arc<dyn Serializer>> {
        self.serializers
            .read()
            .get(id as usize)
            .cloned()
            .ok_or(CodecError::UnknownSerializer { id })
    }

    pub fn serialize(&self, message: &DynMessage, serializer_id: u32) -> Result<SerializedMessage> {
        self.serializer(serializer_id)?.serialize(message)
    }

    pub fn deserialize(
        &self,
        type_name: &str,
        data: &[u8],
        serializer_id: u32,
    ) -> Result<DynMessage> {
        self.serializer(serializer_id)?.deserialize(type_name, data)
    }

    /// Wire type name for `message`: the wrapper's own name for a
    /// [`JsonMessage`], the type table's otherwise.
    pub fn type_name_of(&self, message: &DynMessage) -> Result<String> {
        if let Some(wrapper) = message.downcast_ref::<JsonMessage>() {
            return Ok(wrapper.type_name.clone());
        }
        self.types.name_of(message)
    }

    /// Serializer id a send path should use for `message`.
    pub fn serializer_id_for(&self, message: &DynMessage) -> u32 {
        if message.is::<JsonMessage>() {
            SERIALIZER_ID_JSON
        } else {
            SERIALIZER_ID_BINARY
        }
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::{SERIALIZER_ID_BINARY, SERIALIZER_ID_JSON};
    use lattice_types::message;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        message: String,
    }

    #[test]
    fn binary_round_trip_for_registered_types() {
        let registry = SerializerRegistry::new();
        registry.register_type::<Ping>("pkg.Ping");

        let ping = Ping {
            message: "Hello".to_string(),
        };
        let serialized = registry
            .serialize(&message(ping.clone()), SERIALIZER_ID_BINARY)
            .unwrap();
        assert_eq!(serialized.type_name, "pkg.Ping");

        let decoded = registry
            .deserialize("pkg.Ping", &serialized.data, SERIALIZER_ID_BINARY)
            .unwrap();
        assert_eq!(decoded.downcast_ref::<Ping>().unwrap(), &ping);
    }

    #[test]
    fn json_round_trip_for_registered_types() {
        let registry = SerializerRegistry::new();
        registry.register_type::<Ping>("pkg.Ping");

        let ping = Ping {
            message: "Hello".to_string(),
        };
        let serialized = registry
            .serialize(&message(ping.clone()), SERIALIZER_ID_JSON)
            .unwrap();

        let decoded = registry
            .deserialize("pkg.Ping", &serialized.data, SERIALIZER_ID_JSON)
            .unwrap();
        assert_eq!(decoded.downcast_ref::<Ping>().unwrap(), &ping);
    }

    #[test]
    fn json_pid_round_trip_through_wrapper() {
        let registry = SerializerRegistry::new();

        let wrapper = message(JsonMessage::new(
            WIRE_PID,
            r#"{"Address":"123","Id":"456"}"#,
        ));
        let serialized = registry.serialize(&wrapper, SERIALIZER_ID_JSON).unwrap();
        assert_eq!(serialized.type_name, WIRE_PID);

        let decoded = registry
            .deserialize(WIRE_PID, &serialized.data, SERIALIZER_ID_JSON)
            .unwrap();
        let pid = decoded.downcast_ref::<Pid>().unwrap();
        assert_eq!(pid, &Pid::new("123", "456"));
    }

    #[test]
    fn pid_is_serializable_by_both_serializers() {
        let registry = SerializerRegistry::new();
        let pid = Pid::new("10.0.0.1:4020", "echo");

        for id in [SERIALIZER_ID_BINARY, SERIALIZER_ID_JSON] {
            let serialized = registry.serialize(&message(pid.clone()), id).unwrap();
            assert_eq!(serialized.type_name, WIRE_PID);
            let decoded = registry
                .deserialize(WIRE_PID, &serialized.data, id)
                .unwrap();
            assert_eq!(decoded.downcast_ref::<Pid>().unwrap(), &pid);
        }
    }

    #[test]
    fn unknown_type_surfaces_to_caller() {
        let registry = SerializerRegistry::new();
        let err = registry
            .deserialize("pkg.Missing", b"\0", SERIALIZER_ID_BINARY)
            .unwrap_err();
        assert!(err.is_unknown_type());
    }

    #[test]
    fn unknown_serializer_id_is_rejected() {
        let registry = SerializerRegistry::new();
        let err = registry
            .serialize(&message(Pid::new("a", "b")), 7)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownSerializer { id: 7 }));
    }

    #[test]
    fn send_path_picks_json_for_wrapped_messages() {
        let registry = SerializerRegistry::new();
        let wrapped = message(JsonMessage::new("pkg.Ping", "{}"));
        let plain = message(Pid::new("a", "b"));

        assert_eq!(registry.serializer_id_for(&wrapped), SERIALIZER_ID_JSON);
        assert_eq!(registry.serializer_id_for(&plain), SERIALIZER_ID_BINARY);
    }

    #[test]
    fn user_serializers_get_ids_from_two() {
        struct Passthrough;
        impl Serializer for Passthrough {
            fn serialize(&self, _message: &DynMessage) -> crate::error::Result<SerializedMessage> {
                Ok(SerializedMessage {
                    type_name: "raw".to_string(),
                    data: Vec::new(),
                })
            }
            fn deserialize(
                &self,
                _type_name: &str,
                data: &[u8],
            ) -> crate::error::Result<DynMessage> {
                Ok(message(data.to_vec()))
            }
            fn type_name(&self, _message: &DynMessage) -> crate::error::Result<String> {
                Ok("raw".to_string())
            }
        }

        let registry = SerializerRegistry::new();
        let id = registry.add_serializer(Arc::new(Passthrough));
        assert_eq!(id, 2);

        let decoded = registry.deserialize("raw", &[1, 2, 3], id).unwrap();
        assert_eq!(decoded.downcast_ref::<Vec<u8>>().unwrap(), &vec![1, 2, 3]);
    }
}
