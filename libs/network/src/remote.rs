//! Remote Subsystem Handle
//!
//! Starting the remote layer binds the listener, publishes the advertised
//! address into the process registry, installs the routing hook that picks
//! up traffic for other nodes, starts the endpoint manager's teardown
//! subscription, and spawns the activator. Shutdown drains every endpoint
//! (pending deliveries become dead letters) and stops accepting streams.

use crate::activator::{Activator, ACTIVATOR_NAME};
use crate::config::RemoteConfig;
use crate::endpoint_manager::EndpointManager;
use crate::endpoint_reader::EndpointReader;
use crate::error::{NetError, Result};
use crate::messages::{RemoteDeliver, RemoteUnwatch, RemoteWatch};
use lattice_actors::{
    ActorError, ActorSystem, Props, RemoteHandler, SystemMessage,
};
use lattice_codec::{SerializerRegistry, SERIALIZER_ID_BINARY};
use lattice_types::{
    message, ActorPidRequest, ActorPidResponse, MessageEnvelope, Pid, ResponseStatus, StopActor,
    Terminated, NONHOST,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Default)]
struct RemoteState {
    bound_address: Option<String>,
    accept_task: Option<JoinHandle<()>>,
    activator: Option<Pid>,
}

/// One node's remote messaging subsystem.
pub struct Remote {
    system: Arc<ActorSystem>,
    config: Arc<RemoteConfig>,
    serialization: Arc<SerializerRegistry>,
    manager: Arc<EndpointManager>,
    state: Mutex<RemoteState>,
}

impl Remote {
    pub fn new(system: Arc<ActorSystem>, config: RemoteConfig) -> Arc<Self> {
        let config = Arc::new(config);
        let serialization = Arc::new(SerializerRegistry::new());
        let manager = Arc::new(EndpointManager::new(
            system.clone(),
            config.clone(),
            serialization.clone(),
        ));
        Arc::new(Self {
            system,
            config,
            serialization,
            manager,
            state: Mutex::new(RemoteState::default()),
        })
    }

    pub fn system(&self) -> &Arc<ActorSystem> {
        &self.system
    }

    /// The registry applications register their wire types with.
    pub fn serialization(&self) -> &Arc<SerializerRegistry> {
        &self.serialization
    }

    /// Address peers reach this node at, once started.
    pub fn advertised_address(&self) -> Option<String> {
        self.state.lock().bound_address.clone()
    }

    /// Bind, advertise, and begin accepting peer streams. Returns the
    /// advertised address.
    pub async fn start(self: &Arc<Self>) -> Result<String> {
        let listener = TcpListener::bind(self.config.bind_address())
            .await
            .map_err(|e| NetError::io("failed to bind listener", e))?;
        let bound = listener
            .local_addr()
            .map_err(|e| NetError::io("failed to read bound address", e))?;
        let advertised = self.config.advertised_address(bound.port());

        self.system.process_registry().set_address(advertised.clone());
        let handler = Arc::new(RemoteProcessHandler {
            manager: self.manager.clone(),
            serialization: self.serialization.clone(),
        });
        if !self.system.process_registry().set_remote_handler(handler) {
            warn!("remote handler already installed on this system");
        }
        self.manager.start();

        let activator = {
            let system = self.system.clone();
            let config = self.config.clone();
            let props =
                Props::from_producer(move || Activator::new(system.clone(), config.clone()));
            self.system
                .spawn_named(&props, ACTIVATOR_NAME)
                .map_err(|e| NetError::start(e.to_string()))?
        };

        let reader = Arc::new(EndpointReader::new(
            self.system.clone(),
            self.serialization.clone(),
            self.manager.clone(),
            self.config.max_frame_size,
        ));
        let accept_task = tokio::spawn(reader.serve(listener));

        *self.state.lock() = RemoteState {
            bound_address: Some(advertised.clone()),
            accept_task: Some(accept_task),
            activator: Some(activator),
        };
        info!(
            address = %advertised,
            kinds = ?self.config.known_kinds(),
            "remote started"
        );
        Ok(advertised)
    }

    /// Stop accepting streams and drain every endpoint; undelivered user
    /// messages are published as dead letters.
    pub async fn shutdown(&self) {
        let state = {
            let mut state = self.state.lock();
            std::mem::take(&mut *state)
        };
        if let Some(task) = state.accept_task {
            task.abort();
        }
        self.manager.stop_all();
        if let Some(activator) = state.activator {
            self.system.stop(&activator);
        }
        self.system.process_registry().set_address(NONHOST);
        info!("remote stopped");
    }

    /// Ask `address` to spawn a `kind` actor named `name` (empty name lets
    /// the peer generate one). Timeouts and failures come back in the
    /// response status.
    pub async fn spawn_named(
        &self,
        address: &str,
        name: &str,
        kind: &str,
        timeout: Duration,
    ) -> ActorPidResponse {
        let target = Pid::new(address, ACTIVATOR_NAME);
        let request = ActorPidRequest {
            name: name.to_string(),
            kind: kind.to_string(),
        };
        match self
            .system
            .root()
            .request_async::<ActorPidResponse>(&target, message(request), timeout)
            .await
        {
            Ok(response) => (*response).clone(),
            Err(ActorError::Timeout { .. }) => {
                warn!(peer = %address, kind, "remote spawn timed out");
                ActorPidResponse::error(ResponseStatus::Timeout)
            }
            Err(e) => {
                warn!(peer = %address, kind, error = %e, "remote spawn failed");
                ActorPidResponse::error(ResponseStatus::Error)
            }
        }
    }
}

/// Registry hook routing non-local traffic into the endpoint manager.
struct RemoteProcessHandler {
    manager: Arc<EndpointManager>,
    serialization: Arc<SerializerRegistry>,
}

impl RemoteHandler for RemoteProcessHandler {
    fn deliver_user_message(&self, target: &Pid, envelope: MessageEnvelope) {
        let serializer_id = self.serialization.serializer_id_for(&envelope.message);
        self.manager.remote_deliver(RemoteDeliver {
            header: envelope.header,
            message: envelope.message,
            target: target.clone(),
            sender: envelope.sender,
            serializer_id,
        });
    }

    fn deliver_system_message(&self, target: &Pid, message_in: SystemMessage) {
        match message_in {
            SystemMessage::Watch { watcher } => self.manager.remote_watch(RemoteWatch {
                watcher,
                watchee: target.clone(),
            }),
            SystemMessage::Unwatch { watcher } => self.manager.remote_unwatch(RemoteUnwatch {
                watcher,
                watchee: target.clone(),
            }),
            SystemMessage::Stop => self.manager.remote_deliver(RemoteDeliver {
                header: None,
                message: message(StopActor),
                target: target.clone(),
                sender: None,
                serializer_id: SERIALIZER_ID_BINARY,
            }),
            SystemMessage::Terminated {
                who,
                address_terminated,
            } => self.manager.remote_deliver(RemoteDeliver {
                header: None,
                message: message(Terminated {
                    who,
                    address_terminated,
                }),
                target: target.clone(),
                sender: None,
                serializer_id: SERIALIZER_ID_BINARY,
            }),
            other => {
                debug!(target = %target, ?other, "system message has no remote form");
            }
        }
    }
}
