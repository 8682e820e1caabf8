//! Process Identifiers
//!
//! A [`Pid`] names one actor process anywhere in a cluster: the node that
//! hosts it plus its node-local id. Pids are values; they are freely copied,
//! embedded in messages, and compared structurally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder node address used before the remote layer has started.
///
/// A registry advertising this address can only resolve local processes;
/// pids minted against it compare equal to it, so local routing keeps
/// working on a node that never goes remote.
pub const NONHOST: &str = "nonhost";

/// Process identifier: `(node address, node-local id)`.
///
/// The wire form uses PascalCase field names (`Address`, `Id`) so the JSON
/// rendering is `{"Address": "...", "Id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pid {
    pub address: String,
    pub id: String,
}

impl Pid {
    pub fn new(address: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: id.into(),
        }
    }

    /// Whether this pid lives on the node advertising `node_address`.
    pub fn is_local(&self, node_address: &str) -> bool {
        self.address == node_address
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.id)
    }
}
