//! Props
//!
//! A props value describes how to build an actor: the producer for fresh
//! instances (spawn and restart both use it), the mailbox it runs behind,
//! and its restart limit.

use crate::actor::Actor;
use crate::mailbox::{DefaultMailbox, Mailbox};
use std::sync::Arc;

pub(crate) type ActorProducer = Arc<dyn Fn() -> Box<dyn Actor> + Send + Sync>;
pub(crate) type MailboxProducer = Arc<dyn Fn() -> Arc<dyn Mailbox> + Send + Sync>;

pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Recipe for spawning one actor.
#[derive(Clone)]
pub struct Props {
    producer: ActorProducer,
    mailbox: MailboxProducer,
    max_restarts: u32,
}

impl Props {
    pub fn from_producer<F, A>(producer: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor,
    {
        Self {
            producer: Arc::new(move || Box::new(producer()) as Box<dyn Actor>),
            mailbox: Arc::new(|| Arc::new(DefaultMailbox::default()) as Arc<dyn Mailbox>),
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }

    /// Run the actor behind a custom mailbox.
    pub fn with_mailbox<F, M>(mut self, mailbox: F) -> Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Mailbox + 'static,
    {
        self.mailbox = Arc::new(move || Arc::new(mailbox()) as Arc<dyn Mailbox>);
        self
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub(crate) fn produce(&self) -> Box<dyn Actor> {
        (self.producer)()
    }

    pub(crate) fn produce_mailbox(&self) -> Arc<dyn Mailbox> {
        (self.mailbox)()
    }

    pub(crate) fn max_restarts(&self) -> u32 {
        self.max_restarts
    }
}
