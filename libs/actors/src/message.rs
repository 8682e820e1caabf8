//! System Messages and Supervision
//!
//! System messages drive lifecycle and liveness; they bypass mailbox
//! suspension and take priority over user messages.

use lattice_types::Pid;

/// Runtime-internal messages delivered ahead of user traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMessage {
    /// First message every actor sees.
    Started,
    /// Stop the actor; its watchers are notified.
    Stop,
    /// `watcher` starts observing this actor's liveness.
    Watch { watcher: Pid },
    /// `watcher` stops observing this actor's liveness.
    Unwatch { watcher: Pid },
    /// A watched actor stopped, or its node became unreachable.
    Terminated { who: Pid, address_terminated: bool },
    /// Hold user messages; system messages keep flowing.
    Suspend,
    /// Resume user message processing.
    Resume,
}

/// What to do with an actor after its receive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorDirective {
    /// Keep the current instance and continue.
    Resume,
    /// Replace the instance from its props producer.
    Restart,
    /// Stop the actor.
    Stop,
    /// Hand the failure upward; without a parent this stops the actor.
    Escalate,
}
