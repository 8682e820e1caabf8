//! Actors and Contexts
//!
//! An actor processes one envelope at a time from its mailbox. The context
//! passed to each invocation carries the actor's own pid, the sender of the
//! current message, and a handle to the system for sending, watching, and
//! spawning.

use crate::error::{ActorError, Result};
use crate::message::{SupervisorDirective, SystemMessage};
use crate::props::Props;
use crate::system::ActorSystem;
use async_trait::async_trait;
use lattice_types::{DynMessage, MessageEnvelope, Pid};
use std::sync::Arc;
use tracing::warn;

/// Message-driven computation named by a pid.
#[async_trait]
pub trait Actor: Send + 'static {
    async fn receive(&mut self, ctx: &mut Context, envelope: MessageEnvelope) -> Result<()>;

    async fn started(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    async fn stopped(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Consulted after a receive failure is escalated by the mailbox.
    async fn on_error(&mut self, _ctx: &mut Context, _error: &ActorError) -> SupervisorDirective {
        SupervisorDirective::Restart
    }
}

/// Per-invocation view an actor gets of itself and the system.
pub struct Context {
    system: Arc<ActorSystem>,
    self_pid: Pid,
    sender: Option<Pid>,
}

impl Context {
    pub(crate) fn new(system: Arc<ActorSystem>, self_pid: Pid, sender: Option<Pid>) -> Self {
        Self {
            system,
            self_pid,
            sender,
        }
    }

    pub fn system(&self) -> &Arc<ActorSystem> {
        &self.system
    }

    pub fn self_pid(&self) -> &Pid {
        &self.self_pid
    }

    /// Sender of the message currently being processed.
    pub fn sender(&self) -> Option<&Pid> {
        self.sender.as_ref()
    }

    pub fn send(&self, target: &Pid, message: DynMessage) {
        self.system.send(target, MessageEnvelope::new(message));
    }

    /// Send with this actor as the reply target.
    pub fn request(&self, target: &Pid, message: DynMessage) {
        self.system.send(
            target,
            MessageEnvelope::new(message).with_sender(self.self_pid.clone()),
        );
    }

    /// Reply to the current sender, if there is one.
    pub fn respond(&self, message: DynMessage) {
        match &self.sender {
            Some(sender) => self.system.send(
                sender,
                MessageEnvelope::new(message).with_sender(self.self_pid.clone()),
            ),
            None => warn!(actor = %self.self_pid, "respond called with no sender"),
        }
    }

    /// Observe `target`'s liveness; a `Terminated` envelope arrives when it
    /// stops or its node becomes unreachable.
    pub fn watch(&self, target: &Pid) {
        self.system.send_system(
            target,
            SystemMessage::Watch {
                watcher: self.self_pid.clone(),
            },
        );
    }

    pub fn unwatch(&self, target: &Pid) {
        self.system.send_system(
            target,
            SystemMessage::Unwatch {
                watcher: self.self_pid.clone(),
            },
        );
    }

    pub fn stop(&self, target: &Pid) {
        self.system.send_system(target, SystemMessage::Stop);
    }

    pub fn spawn(&self, props: &Props) -> Result<Pid> {
        self.system.spawn(props)
    }

    pub fn spawn_named(&self, props: &Props, name: &str) -> Result<Pid> {
        self.system.spawn_named(props, name)
    }
}
