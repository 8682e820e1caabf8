//! Root Context
//!
//! The entry point for code outside any actor: fire-and-forget sends,
//! spawning, and request/response. A request registers a one-shot
//! [`FutureProcess`](crate::process::FutureProcess) under a generated
//! correlation pid, sends the envelope with that pid as the sender, and
//! awaits the reply. An elapsed timeout surfaces as `Timeout`; it does not
//! cancel the in-flight send, so the receiver may still process the message.

use crate::error::{ActorError, Result};
use crate::process::FutureProcess;
use crate::props::Props;
use crate::system::ActorSystem;
use lattice_types::{DynMessage, MessageEnvelope, Pid};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct RootContext {
    system: Arc<ActorSystem>,
}

impl RootContext {
    pub(crate) fn new(system: Arc<ActorSystem>) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &Arc<ActorSystem> {
        &self.system
    }

    pub fn spawn(&self, props: &Props) -> Result<Pid> {
        self.system.spawn(props)
    }

    pub fn spawn_named(&self, props: &Props, name: &str) -> Result<Pid> {
        self.system.spawn_named(props, name)
    }

    pub fn send(&self, target: &Pid, message: DynMessage) {
        self.system.send(target, MessageEnvelope::new(message));
    }

    pub fn send_envelope(&self, target: &Pid, envelope: MessageEnvelope) {
        self.system.send(target, envelope);
    }

    pub fn stop(&self, target: &Pid) {
        self.system.stop(target);
    }

    /// Send `message` to `target` and await a typed reply.
    pub async fn request_async<T: Send + Sync + 'static>(
        &self,
        target: &Pid,
        message: DynMessage,
        timeout: Duration,
    ) -> Result<Arc<T>> {
        let (process, reply) = FutureProcess::new();
        let registry = self.system.process_registry();
        let name = registry.next_id();
        let reply_pid = registry.add(&name, process)?;

        self.system.send(
            target,
            MessageEnvelope::new(message).with_sender(reply_pid.clone()),
        );

        let outcome = tokio::time::timeout(timeout, reply).await;
        registry.remove(&reply_pid);

        match outcome {
            Ok(Ok(envelope)) => envelope
                .message
                .downcast::<T>()
                .map_err(|_| ActorError::ResponseTypeMismatch),
            Ok(Err(_)) => Err(ActorError::receive("reply channel closed")),
            Err(_) => Err(ActorError::timeout(timeout)),
        }
    }
}
