//! Control Messages
//!
//! Messages exchanged between nodes as user-level payloads over the same
//! stream as application traffic. Their wire names are fixed for
//! compatibility; the endpoint reader special-cases them on arrival and
//! turns them into local system-level effects.

use crate::pid::Pid;
use serde::{Deserialize, Serialize};

pub const WIRE_PID: &str = "actor.PID";
pub const WIRE_WATCH: &str = "actor.Watch";
pub const WIRE_UNWATCH: &str = "actor.Unwatch";
pub const WIRE_TERMINATED: &str = "actor.Terminated";
pub const WIRE_STOP: &str = "actor.Stop";
pub const WIRE_ACTOR_PID_REQUEST: &str = "remote.ActorPidRequest";
pub const WIRE_ACTOR_PID_RESPONSE: &str = "remote.ActorPidResponse";

/// Start observing the target's liveness on behalf of `watcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub watcher: Pid,
}

/// Stop observing the target's liveness on behalf of `watcher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unwatch {
    pub watcher: Pid,
}

/// Liveness notification delivered to a watcher.
///
/// `address_terminated` distinguishes a graceful actor stop (`false`) from a
/// transport or peer loss (`true`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminated {
    pub who: Pid,
    pub address_terminated: bool,
}

/// Stop the target process. Carried on the wire so a node can stop an actor
/// it does not host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopActor;

/// Ask a peer's activator to spawn a named actor of a registered kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPidRequest {
    pub name: String,
    pub kind: String,
}

/// Activator reply: the spawned (or already existing) pid plus a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorPidResponse {
    pub pid: Option<Pid>,
    pub status_code: i32,
}

impl ActorPidResponse {
    pub fn ok(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            status_code: ResponseStatus::Ok.code(),
        }
    }

    pub fn error(status: ResponseStatus) -> Self {
        Self {
            pid: None,
            status_code: status.code(),
        }
    }

    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::from_code(self.status_code)
    }
}

/// Outcome of a remote spawn or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Ok,
    Unavailable,
    Timeout,
    ProcessNameAlreadyExist,
    Error,
}

impl ResponseStatus {
    pub fn code(self) -> i32 {
        match self {
            ResponseStatus::Ok => 0,
            ResponseStatus::Unavailable => 1,
            ResponseStatus::Timeout => 2,
            ResponseStatus::ProcessNameAlreadyExist => 3,
            ResponseStatus::Error => 4,
        }
    }

    /// Unknown codes collapse to `Error`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ResponseStatus::Ok,
            1 => ResponseStatus::Unavailable,
            2 => ResponseStatus::Timeout,
            3 => ResponseStatus::ProcessNameAlreadyExist,
            _ => ResponseStatus::Error,
        }
    }
}
