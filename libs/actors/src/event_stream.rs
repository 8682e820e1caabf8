//! Event Stream
//!
//! Process-wide pub/sub of dynamically-typed runtime events: dead letters,
//! endpoint lifecycle, and anything else a subsystem wants observers to see.
//! Publishing never blocks; subscribers that fall behind skip ahead.

use lattice_types::{DynMessage, Pid};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const EVENT_STREAM_CAPACITY: usize = 1024;

/// A message the runtime could not deliver.
#[derive(Clone)]
pub struct DeadLetterEvent {
    pub target: Pid,
    pub message: DynMessage,
    pub sender: Option<Pid>,
}

impl fmt::Debug for DeadLetterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadLetterEvent")
            .field("target", &self.target)
            .field("sender", &self.sender)
            .finish()
    }
}

/// Broadcast bus for runtime events.
#[derive(Clone)]
pub struct EventStream {
    tx: broadcast::Sender<DynMessage>,
}

impl EventStream {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_STREAM_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: DynMessage) {
        let _ = self.tx.send(event);
    }

    pub fn publish_value<T: Send + Sync + 'static>(&self, event: T) {
        self.publish(Arc::new(event));
    }

    /// Raw subscription over every published event.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<DynMessage> {
        self.tx.subscribe()
    }

    /// Subscription filtered to events of type `T`.
    ///
    /// A forwarding task owns the broadcast receiver; dropping the returned
    /// receiver ends it.
    pub fn subscribe<T: Send + Sync + 'static>(&self) -> mpsc::UnboundedReceiver<Arc<T>> {
        let mut raw = self.tx.subscribe();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                match raw.recv().await {
                    Ok(event) => {
                        if let Ok(typed) = event.downcast::<T>() {
                            if tx.send(typed).is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        rx
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}
