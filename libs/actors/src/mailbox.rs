//! Mailboxes
//!
//! A mailbox is a pair of unbounded FIFO queues (system and user) behind a
//! single atomic scheduling gate. Producers push and call `schedule`; the
//! first pusher to win the Idle→Busy compare-and-swap submits exactly one
//! run to the dispatcher, so at most one run is ever in flight per mailbox
//! and the consumer needs no further synchronization.

use crate::error::ActorError;
use crate::message::SystemMessage;
use async_trait::async_trait;
use crossbeam_queue::SegQueue;
use lattice_types::MessageEnvelope;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Mailbox scheduling states, transitioned only by compare-and-set.
pub mod status {
    pub const IDLE: u8 = 0;
    pub const BUSY: u8 = 1;
}

/// Messages a mailbox hands to the entity behind it.
#[async_trait]
pub trait MessageInvoker: Send + Sync {
    async fn invoke_system_message(&self, message: SystemMessage) -> Result<(), ActorError>;

    async fn invoke_user_message(&self, envelope: MessageEnvelope) -> Result<(), ActorError>;

    /// A user invocation failed with a non-transport error; the offending
    /// message is attached when there was one.
    async fn escalate_failure(&self, error: ActorError, envelope: Option<MessageEnvelope>);
}

/// Producer-facing mailbox surface.
pub trait Mailbox: Send + Sync {
    fn post_user_message(&self, envelope: MessageEnvelope);

    fn post_system_message(&self, message: SystemMessage);

    /// Attach the consumer. Must be called before the first post is expected
    /// to be processed; posts before attachment stay queued.
    fn register_invoker(&self, invoker: Arc<dyn MessageInvoker>);
}

/// User messages processed per run before the mailbox yields the worker.
pub const DEFAULT_THROUGHPUT: usize = 300;

struct MailboxState {
    system: SegQueue<SystemMessage>,
    user: SegQueue<MessageEnvelope>,
    status: AtomicU8,
    suspended: AtomicBool,
    invoker: OnceLock<Arc<dyn MessageInvoker>>,
    throughput: usize,
}

impl MailboxState {
    fn schedule(this: &Arc<Self>) {
        if this
            .status
            .compare_exchange(status::IDLE, status::BUSY, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let mailbox = Arc::clone(this);
            tokio::spawn(async move { mailbox.run().await });
        }
    }

    async fn run(self: Arc<Self>) {
        let Some(invoker) = self.invoker.get().cloned() else {
            self.status.store(status::IDLE, Ordering::Release);
            return;
        };

        let mut processed = 0;
        loop {
            if let Some(system) = self.system.pop() {
                match system {
                    SystemMessage::Suspend => self.suspended.store(true, Ordering::Release),
                    SystemMessage::Resume => self.suspended.store(false, Ordering::Release),
                    _ => {}
                }
                if let Err(error) = invoker.invoke_system_message(system).await {
                    invoker.escalate_failure(error, None).await;
                }
                processed += 1;
                if processed >= self.throughput {
                    break;
                }
                continue;
            }

            if self.suspended.load(Ordering::Acquire) {
                break;
            }

            let Some(envelope) = self.user.pop() else {
                break;
            };
            match invoker.invoke_user_message(envelope.clone()).await {
                Ok(()) => {}
                Err(error) if error.is_unavailable() => {
                    warn!(error = %error, "mailbox suspended on unavailable target");
                    self.suspended.store(true, Ordering::Release);
                }
                Err(error) => invoker.escalate_failure(error, Some(envelope)).await,
            }
            processed += 1;
            if processed >= self.throughput {
                break;
            }
        }

        self.status.store(status::IDLE, Ordering::Release);
        if !self.system.is_empty()
            || (!self.suspended.load(Ordering::Acquire) && !self.user.is_empty())
        {
            Self::schedule(&self);
        }
    }
}

/// The kernel's default mailbox: one message per user invocation, bounded
/// run length, suspension via `Suspend`/`Resume` system messages.
pub struct DefaultMailbox {
    inner: Arc<MailboxState>,
}

impl DefaultMailbox {
    pub fn new(throughput: usize) -> Self {
        Self {
            inner: Arc::new(MailboxState {
                system: SegQueue::new(),
                user: SegQueue::new(),
                status: AtomicU8::new(status::IDLE),
                suspended: AtomicBool::new(false),
                invoker: OnceLock::new(),
                throughput,
            }),
        }
    }
}

impl Default for DefaultMailbox {
    fn default() -> Self {
        Self::new(DEFAULT_THROUGHPUT)
    }
}

impl Mailbox for DefaultMailbox {
    fn post_user_message(&self, envelope: MessageEnvelope) {
        self.inner.user.push(envelope);
        MailboxState::schedule(&self.inner);
    }

    fn post_system_message(&self, message: SystemMessage) {
        self.inner.system.push(message);
        MailboxState::schedule(&self.inner);
    }

    fn register_invoker(&self, invoker: Arc<dyn MessageInvoker>) {
        let _ = self.inner.invoker.set(invoker);
        MailboxState::schedule(&self.inner);
    }
}
