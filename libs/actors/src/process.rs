//! Processes
//!
//! A process is the registry-visible face of anything that can receive
//! messages: a mailbox-backed actor, or a one-shot reply slot used by
//! request/response.

use crate::mailbox::Mailbox;
use crate::message::SystemMessage;
use lattice_types::{MessageEnvelope, Pid};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Anything addressable through the process registry.
pub trait Process: Send + Sync {
    fn send_user_message(&self, target: &Pid, envelope: MessageEnvelope);

    fn send_system_message(&self, target: &Pid, message: SystemMessage);

    fn stop(&self, target: &Pid) {
        self.send_system_message(target, SystemMessage::Stop);
    }
}

/// Mailbox-backed process for local actors.
pub struct LocalProcess {
    mailbox: Arc<dyn Mailbox>,
}

impl LocalProcess {
    pub fn new(mailbox: Arc<dyn Mailbox>) -> Self {
        Self { mailbox }
    }
}

impl Process for LocalProcess {
    fn send_user_message(&self, _target: &Pid, envelope: MessageEnvelope) {
        self.mailbox.post_user_message(envelope);
    }

    fn send_system_message(&self, _target: &Pid, message: SystemMessage) {
        self.mailbox.post_system_message(message);
    }
}

/// One-shot reply slot registered under a correlation pid.
///
/// The first user message completes the future; everything after that is
/// dropped. System messages are ignored: the requester observes outcomes
/// through the reply or its timeout.
pub struct FutureProcess {
    reply: Mutex<Option<oneshot::Sender<MessageEnvelope>>>,
}

impl FutureProcess {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<MessageEnvelope>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                reply: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }
}

impl Process for FutureProcess {
    fn send_user_message(&self, _target: &Pid, envelope: MessageEnvelope) {
        if let Some(tx) = self.reply.lock().take() {
            let _ = tx.send(envelope);
        }
    }

    fn send_system_message(&self, _target: &Pid, _message: SystemMessage) {}
}
