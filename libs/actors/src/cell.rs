//! Actor Cell
//!
//! The cell sits between a mailbox and an actor instance: it interprets
//! system messages (lifecycle, watch bookkeeping, termination notices),
//! feeds user envelopes to `receive`, and applies supervision directives
//! when a receive fails. The mailbox's single-run guarantee means the
//! instance lock is never contended.

use crate::actor::{Actor, Context};
use crate::error::ActorError;
use crate::mailbox::MessageInvoker;
use crate::message::{SupervisorDirective, SystemMessage};
use crate::props::Props;
use crate::system::ActorSystem;
use async_trait::async_trait;
use lattice_types::{MessageEnvelope, Pid, Terminated};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

pub(crate) struct ActorCell {
    pid: Pid,
    system: Arc<ActorSystem>,
    props: Props,
    state: Mutex<CellState>,
}

struct CellState {
    actor: Box<dyn Actor>,
    watchers: HashSet<Pid>,
    restarts: u32,
    stopping: bool,
}

impl ActorCell {
    pub(crate) fn new(pid: Pid, system: Arc<ActorSystem>, props: &Props) -> Self {
        Self {
            pid,
            system,
            state: Mutex::new(CellState {
                actor: props.produce(),
                watchers: HashSet::new(),
                restarts: 0,
                stopping: false,
            }),
            props: props.clone(),
        }
    }

    fn context(&self, sender: Option<Pid>) -> Context {
        Context::new(self.system.clone(), self.pid.clone(), sender)
    }

    async fn handle_stop(&self) {
        let mut state = self.state.lock().await;
        if state.stopping {
            return;
        }
        state.stopping = true;

        let mut ctx = self.context(None);
        if let Err(err) = state.actor.stopped(&mut ctx).await {
            warn!(actor = %self.pid, error = %err, "stopped hook failed");
        }
        self.system.process_registry().remove(&self.pid);

        for watcher in state.watchers.drain() {
            self.system.send_system(
                &watcher,
                SystemMessage::Terminated {
                    who: self.pid.clone(),
                    address_terminated: false,
                },
            );
        }
        debug!(actor = %self.pid, "actor stopped");
    }
}

#[async_trait]
impl MessageInvoker for ActorCell {
    async fn invoke_system_message(&self, message: SystemMessage) -> Result<(), ActorError> {
        match message {
            SystemMessage::Started => {
                let mut state = self.state.lock().await;
                let mut ctx = self.context(None);
                if let Err(err) = state.actor.started(&mut ctx).await {
                    error!(actor = %self.pid, error = %err, "started hook failed");
                }
                Ok(())
            }
            SystemMessage::Stop => {
                self.handle_stop().await;
                Ok(())
            }
            SystemMessage::Watch { watcher } => {
                let mut state = self.state.lock().await;
                state.watchers.insert(watcher);
                Ok(())
            }
            SystemMessage::Unwatch { watcher } => {
                let mut state = self.state.lock().await;
                state.watchers.remove(&watcher);
                Ok(())
            }
            SystemMessage::Terminated {
                who,
                address_terminated,
            } => {
                // Watched-actor terminations surface to the actor as a
                // regular Terminated envelope.
                let mut state = self.state.lock().await;
                let mut ctx = self.context(None);
                let envelope = MessageEnvelope::wrap(Terminated {
                    who,
                    address_terminated,
                });
                state.actor.receive(&mut ctx, envelope).await
            }
            SystemMessage::Suspend | SystemMessage::Resume => Ok(()),
        }
    }

    async fn invoke_user_message(&self, envelope: MessageEnvelope) -> Result<(), ActorError> {
        let mut state = self.state.lock().await;
        let mut ctx = self.context(envelope.sender.clone());
        state.actor.receive(&mut ctx, envelope).await
    }

    async fn escalate_failure(&self, err: ActorError, _envelope: Option<MessageEnvelope>) {
        let directive = {
            let mut state = self.state.lock().await;
            let mut ctx = self.context(None);
            state.actor.on_error(&mut ctx, &err).await
        };

        match directive {
            SupervisorDirective::Resume => {
                warn!(actor = %self.pid, error = %err, "resuming after failure");
            }
            SupervisorDirective::Restart => {
                let mut state = self.state.lock().await;
                if state.restarts < self.props.max_restarts() {
                    state.restarts += 1;
                    warn!(
                        actor = %self.pid,
                        error = %err,
                        restart = state.restarts,
                        max_restarts = self.props.max_restarts(),
                        "restarting actor"
                    );
                    state.actor = self.props.produce();
                    let mut ctx = self.context(None);
                    if let Err(start_err) = state.actor.started(&mut ctx).await {
                        error!(actor = %self.pid, error = %start_err, "restart start failed");
                    }
                } else {
                    error!(
                        actor = %self.pid,
                        error = %err,
                        max_restarts = self.props.max_restarts(),
                        "restart limit exceeded, stopping actor"
                    );
                    drop(state);
                    self.system.stop(&self.pid);
                }
            }
            SupervisorDirective::Stop => {
                warn!(actor = %self.pid, error = %err, "stopping actor after failure");
                self.system.stop(&self.pid);
            }
            SupervisorDirective::Escalate => {
                // Top-level actors have no parent; escalation ends the actor.
                error!(actor = %self.pid, error = %err, "failure escalated with no supervisor");
                self.system.stop(&self.pid);
            }
        }
    }
}
