//! Actor Error Types

use lattice_types::Pid;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by spawning, sending, and receiving.
#[derive(Error, Debug)]
pub enum ActorError {
    /// A process with this name is already registered.
    #[error("process name `{name}` already exists")]
    ProcessNameAlreadyExist { name: String, existing: Pid },

    /// A request/response did not complete within its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The peer or transport behind the target is not reachable right now.
    #[error("peer unavailable: {message}")]
    Unavailable { message: String },

    /// The actor's receive failed.
    #[error("receive failed: {message}")]
    Receive { message: String },

    /// A request completed with a reply of an unexpected type.
    #[error("unexpected response type for request")]
    ResponseTypeMismatch,
}

/// Result type alias for kernel operations.
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn receive(message: impl Into<String>) -> Self {
        Self::Receive {
            message: message.into(),
        }
    }

    /// Whether the failure is a transport outage the mailbox should pause
    /// on rather than escalate.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Error category for metrics and logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ProcessNameAlreadyExist { .. } => "name_conflict",
            Self::Timeout { .. } => "timeout",
            Self::Unavailable { .. } => "unavailable",
            Self::Receive { .. } => "receive",
            Self::ResponseTypeMismatch => "response_type",
        }
    }
}
