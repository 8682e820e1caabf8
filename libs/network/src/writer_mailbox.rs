//! Endpoint Writer Mailbox
//!
//! The batching variant of the kernel mailbox that sits in front of an
//! endpoint writer. User messages are `RemoteDeliver` items; up to
//! `batch_size` of them coalesce into one writer invocation to amortize
//! frame cost. Endpoint lifecycle events travel through the same user queue
//! but are always delivered individually and never counted against a batch.
//!
//! The mailbox starts suspended: deliveries queue up while the writer is
//! still connecting and flow once it resumes the mailbox. A `Stop` drains
//! whatever is still queued to the event stream as dead letters, one per
//! pending delivery.

use crate::messages::{RemoteDeliver, RemoteDeliverBatch};
use crossbeam_queue::SegQueue;
use lattice_actors::event_stream::DeadLetterEvent;
use lattice_actors::mailbox::{status, Mailbox, MessageInvoker};
use lattice_actors::{EventStream, SystemMessage};
use lattice_types::MessageEnvelope;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

pub(crate) struct EndpointWriterMailbox {
    inner: Arc<WriterMailboxState>,
}

struct WriterMailboxState {
    system: SegQueue<SystemMessage>,
    user: SegQueue<MessageEnvelope>,
    status: AtomicU8,
    suspended: AtomicBool,
    invoker: OnceLock<Arc<dyn MessageInvoker>>,
    batch_size: usize,
    event_stream: EventStream,
}

impl EndpointWriterMailbox {
    pub(crate) fn new(batch_size: usize, event_stream: EventStream) -> Self {
        Self {
            inner: Arc::new(WriterMailboxState {
                system: SegQueue::new(),
                user: SegQueue::new(),
                status: AtomicU8::new(status::IDLE),
                // Held until the writer reports its stream connected.
                suspended: AtomicBool::new(true),
                invoker: OnceLock::new(),
                batch_size: batch_size.max(1),
                event_stream,
            }),
        }
    }
}

impl Mailbox for EndpointWriterMailbox {
    fn post_user_message(&self, envelope: MessageEnvelope) {
        self.inner.user.push(envelope);
        WriterMailboxState::schedule(&self.inner);
    }

    fn post_system_message(&self, message: SystemMessage) {
        self.inner.system.push(message);
        WriterMailboxState::schedule(&self.inner);
    }

    fn register_invoker(&self, invoker: Arc<dyn MessageInvoker>) {
        let _ = self.inner.invoker.set(invoker);
        WriterMailboxState::schedule(&self.inner);
    }
}

impl WriterMailboxState {
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

        loop {
            if let Some(system) = self.system.pop() {
                match system {
                    SystemMessage::Suspend => self.suspended.store(true, Ordering::Release),
                    SystemMessage::Resume => self.suspended.store(false, Ordering::Release),
                    _ => {}
                }
                let is_stop = matches!(system, SystemMessage::Stop);
                if let Err(error) = invoker.invoke_system_message(system).await {
                    invoker.escalate_failure(error, None).await;
                }
                if is_stop {
                    self.drain_to_dead_letters();
                }
                continue;
            }

            if self.suspended.load(Ordering::Acquire) {
                break;
            }

            // Coalesce deliveries; anything else ends the batch and goes out
            // on its own.
            let mut deliveries: Vec<RemoteDeliver> = Vec::new();
            let mut individual: Option<MessageEnvelope> = None;
            while deliveries.len() < self.batch_size {
                if !self.system.is_empty() {
                    break;
                }
                let Some(envelope) = self.user.pop() else {
                    break;
                };
                match envelope.message_as::<RemoteDeliver>() {
                    Some(deliver) => deliveries.push(deliver.clone()),
                    None => {
                        individual = Some(envelope);
                        break;
                    }
                }
            }

            if deliveries.is_empty() && individual.is_none() {
                break;
            }
            if !deliveries.is_empty() {
                let batch = MessageEnvelope::wrap(RemoteDeliverBatch(deliveries));
                self.invoke_user(&invoker, batch).await;
            }
            if let Some(envelope) = individual {
                self.invoke_user(&invoker, envelope).await;
            }
        }

        self.status.store(status::IDLE, Ordering::Release);
        if !self.system.is_empty()
            || (!self.suspended.load(Ordering::Acquire) && !self.user.is_empty())
        {
            Self::schedule(&self);
        }
    }

    async fn invoke_user(&self, invoker: &Arc<dyn MessageInvoker>, envelope: MessageEnvelope) {
        match invoker.invoke_user_message(envelope.clone()).await {
            Ok(()) => {}
            Err(error) if error.is_unavailable() => {
                warn!(error = %error, "endpoint unavailable, mailbox suspended");
                self.suspended.store(true, Ordering::Release);
            }
            Err(error) => invoker.escalate_failure(error, Some(envelope)).await,
        }
    }

    fn drain_to_dead_letters(&self) {
        let mut drained = 0usize;
        while let Some(envelope) = self.user.pop() {
            if let Some(deliver) = envelope.message_as::<RemoteDeliver>() {
                self.event_stream.publish_value(DeadLetterEvent {
                    target: deliver.target.clone(),
                    message: deliver.message.clone(),
                    sender: deliver.sender.clone(),
                });
                drained += 1;
            }
        }
        if drained > 0 {
            info!(count = drained, "undelivered messages published as dead letters");
        }
    }
}
