//! Wire Frames
//!
//! The two framings carried over a peer stream: the one-time connect
//! envelope and the batched message frame. Batches share repeated type
//! names and target pids by offset, so an envelope carries two small
//! indices instead of full strings.

use crate::envelope::MessageHeader;
use crate::pid::Pid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First frame on every new stream: the sender's advertised address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub address: String,
}

/// One serialized message inside a [`MessageBatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub target_index: u32,
    pub type_index: u32,
    pub serializer_id: u32,
    pub data: Vec<u8>,
    pub sender: Option<Pid>,
    pub header: Option<MessageHeader>,
}

/// A batch of serialized messages with shared type-name and target pools.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageBatch {
    pub type_names: Vec<String>,
    pub targets: Vec<Pid>,
    pub envelopes: Vec<WireEnvelope>,
}

/// Everything that crosses a peer stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteFrame {
    Connect(ConnectRequest),
    Batch(MessageBatch),
}

/// Builds a [`MessageBatch`], interning repeated type names and targets.
#[derive(Default)]
pub struct MessageBatchBuilder {
    type_names: Vec<String>,
    type_indices: HashMap<String, u32>,
    targets: Vec<Pid>,
    target_indices: HashMap<Pid, u32>,
    envelopes: Vec<WireEnvelope>,
}

impl MessageBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name` in the type-name pool, adding it on first use.
    pub fn intern_type(&mut self, name: &str) -> u32 {
        if let Some(&index) = self.type_indices.get(name) {
            return index;
        }
        let index = self.type_names.len() as u32;
        self.type_names.push(name.to_string());
        self.type_indices.insert(name.to_string(), index);
        index
    }

    /// Index of `target` in the target pool, adding it on first use.
    pub fn intern_target(&mut self, target: &Pid) -> u32 {
        if let Some(&index) = self.target_indices.get(target) {
            return index;
        }
        let index = self.targets.len() as u32;
        self.targets.push(target.clone());
        self.target_indices.insert(target.clone(), index);
        index
    }

    pub fn push(
        &mut self,
        target: &Pid,
        type_name: &str,
        serializer_id: u32,
        data: Vec<u8>,
        sender: Option<Pid>,
        header: Option<MessageHeader>,
    ) {
        let target_index = self.intern_target(target);
        let type_index = self.intern_type(type_name);
        self.envelopes.push(WireEnvelope {
            target_index,
            type_index,
            serializer_id,
            data,
            sender,
            header,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn build(self) -> MessageBatch {
        MessageBatch {
            type_names: self.type_names,
            targets: self.targets,
            envelopes: self.envelopes,
        }
    }
}
