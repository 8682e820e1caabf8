//! Endpoint Watcher
//!
//! Per-peer watch registry. Pairs of `(watcher pid, watchee id)` are
//! recorded on the watcher's node; the peer only ever learns plain watch
//! and unwatch control messages. When the peer reports a watchee stopped,
//! the pair is removed and exactly one termination is injected at the
//! watcher. When the whole endpoint dies, every recorded pair synthesizes a
//! termination with `address_terminated` set, then the table is cleared and
//! the watcher retires itself.

use crate::messages::{EndpointTerminatedEvent, RemoteTerminate, RemoteUnwatch, RemoteWatch};
use async_trait::async_trait;
use lattice_actors::{Actor, ActorError, ActorSystem, Context, SystemMessage};
use lattice_types::{MessageEnvelope, Pid, Unwatch, Watch};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) struct EndpointWatcher {
    /// The peer this watcher fronts.
    address: String,
    system: Arc<ActorSystem>,
    /// watchee id at the peer → local watcher pids.
    watched: HashMap<String, HashSet<Pid>>,
}

impl EndpointWatcher {
    pub(crate) fn new(address: String, system: Arc<ActorSystem>) -> Self {
        Self {
            address,
            system,
            watched: HashMap::new(),
        }
    }

    fn handle_watch(&mut self, watch: &RemoteWatch) {
        let added = self
            .watched
            .entry(watch.watchee.id.clone())
            .or_default()
            .insert(watch.watcher.clone());
        if added {
            debug!(
                peer = %self.address,
                watcher = %watch.watcher,
                watchee = %watch.watchee,
                "watch recorded"
            );
        }
        // Idempotent at the peer too; forwarding again is harmless.
        self.system.send(
            &watch.watchee,
            MessageEnvelope::wrap(Watch {
                watcher: watch.watcher.clone(),
            }),
        );
    }

    fn handle_unwatch(&mut self, unwatch: &RemoteUnwatch) {
        if let Some(watchers) = self.watched.get_mut(&unwatch.watchee.id) {
            watchers.remove(&unwatch.watcher);
            if watchers.is_empty() {
                self.watched.remove(&unwatch.watchee.id);
            }
        }
        self.system.send(
            &unwatch.watchee,
            MessageEnvelope::wrap(Unwatch {
                watcher: unwatch.watcher.clone(),
            }),
        );
    }

    fn handle_terminate(&mut self, terminate: &RemoteTerminate) {
        // Only a still-recorded pair notifies, so each logical termination
        // reaches a watcher at most once.
        let Some(watchers) = self.watched.get_mut(&terminate.watchee.id) else {
            return;
        };
        if !watchers.remove(&terminate.watcher) {
            return;
        }
        if watchers.is_empty() {
            self.watched.remove(&terminate.watchee.id);
        }
        debug!(
            peer = %self.address,
            watcher = %terminate.watcher,
            watchee = %terminate.watchee,
            "watched actor stopped"
        );
        self.system.send_system(
            &terminate.watcher,
            SystemMessage::Terminated {
                who: terminate.watchee.clone(),
                address_terminated: false,
            },
        );
    }

    fn handle_endpoint_terminated(&mut self, ctx: &Context) {
        let pairs: usize = self.watched.values().map(HashSet::len).sum();
        info!(
            peer = %self.address,
            pairs,
            "peer lost, synthesizing terminations"
        );
        for (watchee_id, watchers) in self.watched.drain() {
            let who = Pid::new(self.address.clone(), watchee_id);
            for watcher in watchers {
                self.system.send_system(
                    &watcher,
                    SystemMessage::Terminated {
                        who: who.clone(),
                        address_terminated: true,
                    },
                );
            }
        }
        // The endpoint is gone; this watcher's job is done.
        ctx.stop(ctx.self_pid());
    }
}

#[async_trait]
impl Actor for EndpointWatcher {
    async fn receive(
        &mut self,
        ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        if let Some(watch) = envelope.message_as::<RemoteWatch>() {
            self.handle_watch(watch);
        } else if let Some(unwatch) = envelope.message_as::<RemoteUnwatch>() {
            self.handle_unwatch(unwatch);
        } else if let Some(terminate) = envelope.message_as::<RemoteTerminate>() {
            self.handle_terminate(terminate);
        } else if envelope.message_as::<EndpointTerminatedEvent>().is_some() {
            self.handle_endpoint_terminated(ctx);
        }
        Ok(())
    }
}
