//! Remote-Internal Messages
//!
//! Queue items and events that never cross the wire themselves: deliveries
//! on their way to an endpoint writer, watch bookkeeping commands, and
//! endpoint lifecycle events published on the event stream.

use lattice_types::{DynMessage, MessageHeader, Pid};
use std::fmt;

/// One outbound user message, produced by the send path and consumed by the
/// endpoint writer for the target's node.
#[derive(Clone)]
pub struct RemoteDeliver {
    pub header: Option<MessageHeader>,
    pub message: DynMessage,
    pub target: Pid,
    pub sender: Option<Pid>,
    pub serializer_id: u32,
}

impl fmt::Debug for RemoteDeliver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDeliver")
            .field("target", &self.target)
            .field("sender", &self.sender)
            .field("serializer_id", &self.serializer_id)
            .finish()
    }
}

/// A coalesced run of deliveries handed to the writer as one invocation.
#[derive(Debug, Clone)]
pub struct RemoteDeliverBatch(pub Vec<RemoteDeliver>);

/// Record a watch of a remote actor and forward it to the peer.
#[derive(Debug, Clone)]
pub struct RemoteWatch {
    pub watcher: Pid,
    pub watchee: Pid,
}

/// Remove a watch of a remote actor and forward it to the peer.
#[derive(Debug, Clone)]
pub struct RemoteUnwatch {
    pub watcher: Pid,
    pub watchee: Pid,
}

/// The peer reported that a watched actor stopped.
#[derive(Debug, Clone)]
pub struct RemoteTerminate {
    pub watcher: Pid,
    pub watchee: Pid,
}

/// An endpoint's stream is up; published on the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConnectedEvent {
    pub address: String,
}

/// An endpoint is gone for good; published on the event stream. The manager
/// reacts by synthesizing terminations and tearing the endpoint pair down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTerminatedEvent {
    pub address: String,
}
