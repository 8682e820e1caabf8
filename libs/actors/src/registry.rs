//! Process Registry
//!
//! Name → process mapping for one node, plus the node's advertised address
//! and the hook the remote layer installs to pick up traffic addressed to
//! other nodes.

use crate::error::ActorError;
use crate::message::SystemMessage;
use crate::process::Process;
use lattice_types::{MessageEnvelope, Pid, NONHOST};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Routes traffic whose target address is not this node.
pub trait RemoteHandler: Send + Sync {
    fn deliver_user_message(&self, target: &Pid, envelope: MessageEnvelope);

    fn deliver_system_message(&self, target: &Pid, message: SystemMessage);
}

/// The single owner of name → process resolution on one node.
pub struct ProcessRegistry {
    address: RwLock<String>,
    processes: RwLock<HashMap<String, Arc<dyn Process>>>,
    sequence: AtomicU64,
    remote_handler: OnceLock<Arc<dyn RemoteHandler>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            address: RwLock::new(NONHOST.to_string()),
            processes: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
            remote_handler: OnceLock::new(),
        }
    }

    /// The node address pids are minted against.
    pub fn address(&self) -> String {
        self.address.read().clone()
    }

    /// Set the advertised address; done once when the remote layer starts.
    pub fn set_address(&self, address: impl Into<String>) {
        *self.address.write() = address.into();
    }

    /// Next generated process name.
    pub fn next_id(&self) -> String {
        format!("${}", self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    /// Register `process` under `name`. Fails with the existing pid when the
    /// name is taken.
    pub fn add(&self, name: &str, process: Arc<dyn Process>) -> Result<Pid, ActorError> {
        let address = self.address();
        let mut processes = self.processes.write();
        if processes.contains_key(name) {
            return Err(ActorError::ProcessNameAlreadyExist {
                name: name.to_string(),
                existing: Pid::new(address, name),
            });
        }
        processes.insert(name.to_string(), process);
        debug!(name, "registered process");
        Ok(Pid::new(address, name))
    }

    pub fn remove(&self, pid: &Pid) {
        if self.processes.write().remove(&pid.id).is_some() {
            debug!(id = %pid.id, "removed process");
        }
    }

    pub fn get_local(&self, id: &str) -> Option<Arc<dyn Process>> {
        self.processes.read().get(id).cloned()
    }

    /// Install the remote routing hook. Returns `false` if one was already
    /// installed; the first handler stays in place.
    pub fn set_remote_handler(&self, handler: Arc<dyn RemoteHandler>) -> bool {
        self.remote_handler.set(handler).is_ok()
    }

    pub fn remote_handler(&self) -> Option<Arc<dyn RemoteHandler>> {
        self.remote_handler.get().cloned()
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}
