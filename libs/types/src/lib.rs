//! Core Data Model
//!
//! Plain data shared by every layer of the lattice runtime: process
//! identifiers, message envelopes, the control messages exchanged between
//! nodes, and the wire frames that carry them. This crate holds no I/O and
//! no runtime state; everything here is cheap to clone and serde-derived
//! where it crosses a process boundary.

pub mod control;
pub mod envelope;
pub mod pid;
pub mod wire;

pub use control::{
    ActorPidRequest, ActorPidResponse, ResponseStatus, StopActor, Terminated, Unwatch, Watch,
    WIRE_ACTOR_PID_REQUEST, WIRE_ACTOR_PID_RESPONSE, WIRE_PID, WIRE_STOP, WIRE_TERMINATED,
    WIRE_UNWATCH, WIRE_WATCH,
};
pub use envelope::{downcast_message, message, DynMessage, MessageEnvelope, MessageHeader};
pub use pid::{Pid, NONHOST};
pub use wire::{ConnectRequest, MessageBatch, MessageBatchBuilder, RemoteFrame, WireEnvelope};
