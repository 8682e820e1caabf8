//! Endpoint Manager
//!
//! Tracks exactly one writer/watcher pair per remote address. The pair is
//! created lazily on the first outbound reference (a send, a watch, or a
//! spawn) and torn down when the endpoint's termination event fires: the
//! watcher gets the event first so it can synthesize terminations, then the
//! writer is stopped so its mailbox drains to dead letters, and the entry is
//! removed. The next outbound reference recreates the pair from scratch,
//! which is what makes the retry policy apply again.

use crate::config::RemoteConfig;
use crate::endpoint_watcher::EndpointWatcher;
use crate::endpoint_writer::EndpointWriter;
use crate::messages::{
    EndpointTerminatedEvent, RemoteDeliver, RemoteTerminate, RemoteUnwatch, RemoteWatch,
};
use crate::writer_mailbox::EndpointWriterMailbox;
use lattice_actors::{ActorError, ActorSystem, Props};
use lattice_codec::SerializerRegistry;
use lattice_types::{MessageEnvelope, Pid};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The writer/watcher pair owning one peer connection.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    pub address: String,
    pub writer: Pid,
    pub watcher: Pid,
}

pub(crate) struct EndpointManager {
    system: Arc<ActorSystem>,
    config: Arc<RemoteConfig>,
    serialization: Arc<SerializerRegistry>,
    endpoints: Mutex<HashMap<String, Endpoint>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl EndpointManager {
    pub(crate) fn new(
        system: Arc<ActorSystem>,
        config: Arc<RemoteConfig>,
        serialization: Arc<SerializerRegistry>,
    ) -> Self {
        Self {
            system,
            config,
            serialization,
            endpoints: Mutex::new(HashMap::new()),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to endpoint terminations so dead peers are torn down.
    pub(crate) fn start(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let mut events = self
            .system
            .event_stream()
            .subscribe::<EndpointTerminatedEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                manager.handle_endpoint_terminated(&event);
            }
        });
        *self.subscription.lock() = Some(task);
    }

    fn handle_endpoint_terminated(&self, event: &EndpointTerminatedEvent) {
        let endpoint = self.endpoints.lock().remove(&event.address);
        let Some(endpoint) = endpoint else {
            return;
        };
        info!(peer = %endpoint.address, "endpoint terminated");
        // Watcher first: it synthesizes terminations, then retires itself.
        self.system
            .send(&endpoint.watcher, MessageEnvelope::wrap(event.clone()));
        // Stopping the writer drains its queue to dead letters.
        self.system.stop(&endpoint.writer);
    }

    /// The endpoint for `address`, creating the pair on first reference.
    fn ensure_endpoint(&self, address: &str) -> Result<Endpoint, ActorError> {
        if let Some(endpoint) = self.endpoints.lock().get(address) {
            return Ok(endpoint.clone());
        }

        // Spawn outside the map lock; a racing create is resolved below.
        let writer = {
            let address = address.to_string();
            let system = self.system.clone();
            let config = self.config.clone();
            let serialization = self.serialization.clone();
            let batch_size = self.config.endpoint_writer_batch_size;
            let event_stream = self.system.event_stream().clone();
            let props = Props::from_producer(move || {
                EndpointWriter::new(
                    address.clone(),
                    config.clone(),
                    system.clone(),
                    serialization.clone(),
                )
            })
            .with_mailbox(move || EndpointWriterMailbox::new(batch_size, event_stream.clone()))
            .with_max_restarts(0);
            self.system.spawn(&props)?
        };
        let watcher = {
            let address = address.to_string();
            let system = self.system.clone();
            let props = Props::from_producer(move || {
                EndpointWatcher::new(address.clone(), system.clone())
            });
            self.system.spawn(&props)?
        };

        let endpoint = Endpoint {
            address: address.to_string(),
            writer,
            watcher,
        };
        let mut endpoints = self.endpoints.lock();
        if let Some(existing) = endpoints.get(address) {
            // Lost the race; retire the pair just spawned.
            let existing = existing.clone();
            drop(endpoints);
            self.system.stop(&endpoint.writer);
            self.system.stop(&endpoint.watcher);
            return Ok(existing);
        }
        info!(peer = %address, writer = %endpoint.writer, "endpoint opened");
        endpoints.insert(address.to_string(), endpoint.clone());
        Ok(endpoint)
    }

    pub(crate) fn remote_deliver(&self, deliver: RemoteDeliver) {
        let address = deliver.target.address.clone();
        match self.ensure_endpoint(&address) {
            Ok(endpoint) => {
                self.system
                    .send(&endpoint.writer, MessageEnvelope::wrap(deliver));
            }
            Err(e) => warn!(peer = %address, error = %e, "failed to open endpoint"),
        }
    }

    pub(crate) fn remote_watch(&self, watch: RemoteWatch) {
        let address = watch.watchee.address.clone();
        match self.ensure_endpoint(&address) {
            Ok(endpoint) => {
                self.system
                    .send(&endpoint.watcher, MessageEnvelope::wrap(watch));
            }
            Err(e) => warn!(peer = %address, error = %e, "failed to open endpoint"),
        }
    }

    pub(crate) fn remote_unwatch(&self, unwatch: RemoteUnwatch) {
        let address = unwatch.watchee.address.clone();
        match self.ensure_endpoint(&address) {
            Ok(endpoint) => {
                self.system
                    .send(&endpoint.watcher, MessageEnvelope::wrap(unwatch));
            }
            Err(e) => warn!(peer = %address, error = %e, "failed to open endpoint"),
        }
    }

    pub(crate) fn remote_terminate(&self, terminate: RemoteTerminate) {
        let address = terminate.watchee.address.clone();
        match self.ensure_endpoint(&address) {
            Ok(endpoint) => {
                self.system
                    .send(&endpoint.watcher, MessageEnvelope::wrap(terminate));
            }
            Err(e) => warn!(peer = %address, error = %e, "failed to open endpoint"),
        }
    }

    /// Tear down every endpoint; pending deliveries become dead letters.
    pub(crate) fn stop_all(&self) {
        if let Some(task) = self.subscription.lock().take() {
            task.abort();
        }
        let endpoints: Vec<Endpoint> = self.endpoints.lock().drain().map(|(_, e)| e).collect();
        for endpoint in endpoints {
            debug!(peer = %endpoint.address, "closing endpoint");
            self.system.stop(&endpoint.writer);
            self.system.stop(&endpoint.watcher);
        }
    }
}
