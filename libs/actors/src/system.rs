//! Actor System
//!
//! The process-wide container the subsystems hang off: the process registry,
//! the event stream, and the spawn/send entry points. A system is created
//! once and injected into components at construction; nothing here is a
//! global.

use crate::cell::ActorCell;
use crate::error::Result;
use crate::event_stream::{DeadLetterEvent, EventStream};
use crate::message::SystemMessage;
use crate::process::LocalProcess;
use crate::props::Props;
use crate::registry::ProcessRegistry;
use crate::root::RootContext;
use lattice_types::{MessageEnvelope, Pid};
use std::sync::Arc;
use tracing::debug;

pub struct ActorSystem {
    registry: ProcessRegistry,
    event_stream: EventStream,
}

impl ActorSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registry: ProcessRegistry::new(),
            event_stream: EventStream::new(),
        })
    }

    /// This node's advertised address.
    pub fn address(&self) -> String {
        self.registry.address()
    }

    pub fn process_registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn event_stream(&self) -> &EventStream {
        &self.event_stream
    }

    pub fn root(self: &Arc<Self>) -> RootContext {
        RootContext::new(self.clone())
    }

    /// Spawn under a generated name.
    pub fn spawn(self: &Arc<Self>, props: &Props) -> Result<Pid> {
        let name = self.registry.next_id();
        self.spawn_named(props, &name)
    }

    /// Spawn under `name`; fails with the existing pid when the name is
    /// taken.
    pub fn spawn_named(self: &Arc<Self>, props: &Props, name: &str) -> Result<Pid> {
        let mailbox = props.produce_mailbox();
        let process = Arc::new(LocalProcess::new(mailbox.clone()));
        let pid = self.registry.add(name, process)?;

        let cell = Arc::new(ActorCell::new(pid.clone(), self.clone(), props));
        mailbox.register_invoker(cell);
        mailbox.post_system_message(SystemMessage::Started);

        debug!(actor = %pid, "spawned actor");
        Ok(pid)
    }

    /// Deliver a user envelope, routing local/remote by the target address.
    pub fn send(&self, target: &Pid, envelope: MessageEnvelope) {
        if target.is_local(&self.address()) {
            match self.registry.get_local(&target.id) {
                Some(process) => process.send_user_message(target, envelope),
                None => self.dead_letter(target, envelope),
            }
        } else if let Some(handler) = self.registry.remote_handler() {
            handler.deliver_user_message(target, envelope);
        } else {
            self.dead_letter(target, envelope);
        }
    }

    /// Inject a system message, routing local/remote by the target address.
    pub fn send_system(&self, target: &Pid, message: SystemMessage) {
        if target.is_local(&self.address()) {
            match self.registry.get_local(&target.id) {
                Some(process) => process.send_system_message(target, message),
                None => debug!(target = %target, ?message, "system message for unknown process"),
            }
        } else if let Some(handler) = self.registry.remote_handler() {
            handler.deliver_system_message(target, message);
        } else {
            debug!(target = %target, ?message, "system message for remote target with no remote layer");
        }
    }

    pub fn stop(&self, target: &Pid) {
        self.send_system(target, SystemMessage::Stop);
    }

    fn dead_letter(&self, target: &Pid, envelope: MessageEnvelope) {
        debug!(target = %target, "dead letter");
        self.event_stream.publish_value(DeadLetterEvent {
            target: target.clone(),
            message: envelope.message,
            sender: envelope.sender,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Context};
    use crate::error::ActorError;
    use async_trait::async_trait;
    use lattice_types::Terminated;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Forwards every received envelope into a channel for assertions.
    struct Probe {
        tx: mpsc::UnboundedSender<MessageEnvelope>,
    }

    #[async_trait]
    impl Actor for Probe {
        async fn receive(
            &mut self,
            _ctx: &mut Context,
            envelope: MessageEnvelope,
        ) -> std::result::Result<(), ActorError> {
            let _ = self.tx.send(envelope);
            Ok(())
        }
    }

    fn probe_props() -> (Props, mpsc::UnboundedReceiver<MessageEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let props = Props::from_producer(move || Probe { tx: tx.clone() });
        (props, rx)
    }

    async fn recv(
        rx: &mut mpsc::UnboundedReceiver<MessageEnvelope>,
        what: &str,
    ) -> MessageEnvelope {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .unwrap_or_else(|| panic!("channel closed waiting for {what}"))
    }

    #[tokio::test]
    async fn send_reaches_spawned_actor() {
        let system = ActorSystem::new();
        let (props, mut rx) = probe_props();
        let pid = system.spawn_named(&props, "probe").unwrap();

        system.send(&pid, MessageEnvelope::wrap("hello".to_string()));

        let envelope = recv(&mut rx, "message").await;
        assert_eq!(envelope.message_as::<String>().unwrap(), "hello");
    }

    #[tokio::test]
    async fn missing_target_becomes_dead_letter() {
        let system = ActorSystem::new();
        let mut dead_letters = system.event_stream().subscribe::<DeadLetterEvent>();
        tokio::task::yield_now().await;

        let target = Pid::new(system.address(), "nobody");
        let sender = Pid::new(system.address(), "someone");
        system.send(
            &target,
            MessageEnvelope::wrap(1u32).with_sender(sender.clone()),
        );

        let event = tokio::time::timeout(Duration::from_secs(5), dead_letters.recv())
            .await
            .expect("timed out waiting for dead letter")
            .unwrap();
        assert_eq!(event.target, target);
        assert_eq!(event.sender, Some(sender));
    }

    #[tokio::test]
    async fn watcher_sees_exactly_one_termination() {
        let system = ActorSystem::new();
        let (watcher_props, mut watcher_rx) = probe_props();
        let (watchee_props, _watchee_rx) = probe_props();

        let watcher = system.spawn_named(&watcher_props, "watcher").unwrap();
        let watchee = system.spawn_named(&watchee_props, "watchee").unwrap();

        system.send_system(
            &watchee,
            SystemMessage::Watch {
                watcher: watcher.clone(),
            },
        );
        system.stop(&watchee);

        let envelope = recv(&mut watcher_rx, "termination").await;
        let terminated = envelope.message_as::<Terminated>().unwrap();
        assert_eq!(terminated.who, watchee);
        assert!(!terminated.address_terminated);

        // No second notification for the same stop.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(watcher_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unwatched_watcher_is_not_notified() {
        let system = ActorSystem::new();
        let (watcher_props, mut watcher_rx) = probe_props();
        let (watchee_props, _watchee_rx) = probe_props();

        let watcher = system.spawn_named(&watcher_props, "watcher").unwrap();
        let watchee = system.spawn_named(&watchee_props, "watchee").unwrap();

        system.send_system(
            &watchee,
            SystemMessage::Watch {
                watcher: watcher.clone(),
            },
        );
        system.send_system(
            &watchee,
            SystemMessage::Unwatch {
                watcher: watcher.clone(),
            },
        );
        system.stop(&watchee);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(watcher_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn spawn_named_conflict_reports_existing_pid() {
        let system = ActorSystem::new();
        let (props, _rx) = probe_props();

        let first = system.spawn_named(&props, "echo").unwrap();
        let err = system.spawn_named(&props, "echo").unwrap_err();
        match err {
            ActorError::ProcessNameAlreadyExist { existing, .. } => assert_eq!(existing, first),
            other => panic!("unexpected error: {other}"),
        }
    }
}
