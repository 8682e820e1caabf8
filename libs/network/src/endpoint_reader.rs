//! Endpoint Reader
//!
//! Server side of the peer stream. Each accepted connection must open with
//! a connect envelope naming the peer's advertised address; every frame
//! after that is a message batch. Batches are unpacked envelope by
//! envelope: control messages become local system effects, everything else
//! is rebuilt into a user envelope and dispatched. Lookup and decode
//! failures dead-letter the one envelope and leave the stream open.

use crate::endpoint_manager::EndpointManager;
use crate::messages::RemoteTerminate;
use crate::transport::FramedConnection;
use lattice_actors::event_stream::DeadLetterEvent;
use lattice_actors::{ActorSystem, SystemMessage};
use lattice_codec::SerializerRegistry;
use lattice_types::{
    message, MessageBatch, MessageEnvelope, RemoteFrame, StopActor, Terminated, Unwatch, Watch,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub(crate) struct EndpointReader {
    system: Arc<ActorSystem>,
    serialization: Arc<SerializerRegistry>,
    manager: Arc<EndpointManager>,
    max_frame_size: usize,
}

impl EndpointReader {
    pub(crate) fn new(
        system: Arc<ActorSystem>,
        serialization: Arc<SerializerRegistry>,
        manager: Arc<EndpointManager>,
        max_frame_size: usize,
    ) -> Self {
        Self {
            system,
            serialization,
            manager,
            max_frame_size,
        }
    }

    /// Accept loop. Runs until the owning task is aborted; dropping the
    /// join set then aborts every per-connection task with it.
    pub(crate) async fn serve(self: Arc<Self>, listener: TcpListener) {
        let mut connections = JoinSet::new();
        loop {
            // Reap finished connection tasks as we go.
            while connections.try_join_next().is_some() {}

            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    let reader = Arc::clone(&self);
                    connections.spawn(async move { reader.handle_connection(stream, peer).await });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let mut connection = FramedConnection::from_stream(stream, self.max_frame_size);

        // The first frame must announce who is talking to us.
        let peer_address = match connection.read_frame().await {
            Ok(RemoteFrame::Connect(connect)) => {
                info!(peer = %connect.address, "peer stream opened");
                connect.address
            }
            Ok(RemoteFrame::Batch(_)) => {
                warn!(%peer, "stream did not begin with a connect envelope");
                return;
            }
            Err(e) => {
                debug!(%peer, error = %e, "stream closed before connect");
                return;
            }
        };

        loop {
            match connection.read_frame().await {
                Ok(RemoteFrame::Batch(batch)) => self.handle_batch(batch),
                Ok(RemoteFrame::Connect(_)) => {
                    warn!(peer = %peer_address, "duplicate connect envelope ignored");
                }
                Err(e) => {
                    debug!(peer = %peer_address, error = %e, "peer stream closed");
                    break;
                }
            }
        }
    }

    fn handle_batch(&self, batch: MessageBatch) {
        for envelope in &batch.envelopes {
            let Some(target) = batch.targets.get(envelope.target_index as usize) else {
                warn!(
                    target_index = envelope.target_index,
                    "batch envelope with out-of-range target index"
                );
                continue;
            };
            let Some(type_name) = batch.type_names.get(envelope.type_index as usize) else {
                warn!(
                    type_index = envelope.type_index,
                    "batch envelope with out-of-range type index"
                );
                continue;
            };

            let payload = match self.serialization.deserialize(
                type_name,
                &envelope.data,
                envelope.serializer_id,
            ) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(
                        type_name,
                        serializer_id = envelope.serializer_id,
                        error = %e,
                        "undecodable message"
                    );
                    self.system.event_stream().publish_value(DeadLetterEvent {
                        target: target.clone(),
                        message: message(type_name.clone()),
                        sender: envelope.sender.clone(),
                    });
                    continue;
                }
            };

            // Control messages turn into local system effects; the target
            // of a termination report is the local watcher.
            if let Some(terminated) = payload.downcast_ref::<Terminated>() {
                self.manager.remote_terminate(RemoteTerminate {
                    watcher: target.clone(),
                    watchee: terminated.who.clone(),
                });
            } else if let Some(watch) = payload.downcast_ref::<Watch>() {
                self.system.send_system(
                    target,
                    SystemMessage::Watch {
                        watcher: watch.watcher.clone(),
                    },
                );
            } else if let Some(unwatch) = payload.downcast_ref::<Unwatch>() {
                self.system.send_system(
                    target,
                    SystemMessage::Unwatch {
                        watcher: unwatch.watcher.clone(),
                    },
                );
            } else if payload.is::<StopActor>() {
                self.system.send_system(target, SystemMessage::Stop);
            } else {
                let mut user = MessageEnvelope::new(payload);
                if let Some(sender) = &envelope.sender {
                    user = user.with_sender(sender.clone());
                }
                if let Some(header) = &envelope.header {
                    user = user.with_header(header.clone());
                }
                // A missing target dead-letters inside send.
                self.system.send(target, user);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use async_trait::async_trait;
    use lattice_actors::{Actor, ActorError, Context, Props};
    use lattice_codec::SERIALIZER_ID_BINARY;
    use lattice_types::{MessageBatchBuilder, Pid};
    use tokio::sync::mpsc;

    struct Probe {
        tx: mpsc::UnboundedSender<MessageEnvelope>,
    }

    #[async_trait]
    impl Actor for Probe {
        async fn receive(
            &mut self,
            _ctx: &mut Context,
            envelope: MessageEnvelope,
        ) -> Result<(), ActorError> {
            let _ = self.tx.send(envelope);
            Ok(())
        }
    }

    fn reader_for(system: &Arc<ActorSystem>) -> (EndpointReader, Arc<SerializerRegistry>) {
        let config = Arc::new(RemoteConfig::default());
        let serialization = Arc::new(SerializerRegistry::new());
        let manager = Arc::new(EndpointManager::new(
            system.clone(),
            config.clone(),
            serialization.clone(),
        ));
        (
            EndpointReader::new(
                system.clone(),
                serialization.clone(),
                manager,
                config.max_frame_size,
            ),
            serialization,
        )
    }

    #[tokio::test]
    async fn batch_envelopes_reach_local_actors_with_sender_and_header() {
        let system = ActorSystem::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let props = Props::from_producer(move || Probe { tx: tx.clone() });
        let pid = system.spawn_named(&props, "probe").unwrap();
        let (reader, serialization) = reader_for(&system);

        let sender = Pid::new("peer:1", "$9");
        let payload = serialization
            .serialize(&message(Pid::new("a", "b")), SERIALIZER_ID_BINARY)
            .unwrap();
        let mut builder = MessageBatchBuilder::new();
        builder.push(
            &pid,
            &payload.type_name,
            SERIALIZER_ID_BINARY,
            payload.data,
            Some(sender.clone()),
            Some(lattice_types::MessageHeader::new().with("trace-id", "t7")),
        );
        reader.handle_batch(builder.build());

        let envelope = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(envelope.message_as::<Pid>().unwrap(), &Pid::new("a", "b"));
        assert_eq!(envelope.sender(), Some(&sender));
        assert_eq!(envelope.header_value("trace-id"), Some("t7"));
    }

    #[tokio::test]
    async fn undecodable_and_unknown_targets_dead_letter_without_closing() {
        let system = ActorSystem::new();
        let (reader, serialization) = reader_for(&system);
        let mut dead_letters = system.event_stream().subscribe::<DeadLetterEvent>();
        tokio::task::yield_now().await;

        // Unknown type name.
        let mut builder = MessageBatchBuilder::new();
        builder.push(
            &Pid::new(system.address(), "nobody"),
            "pkg.Missing",
            SERIALIZER_ID_BINARY,
            vec![0],
            None,
            None,
        );
        reader.handle_batch(builder.build());

        let event = tokio::time::timeout(Duration::from_secs(5), dead_letters.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(event.target.id, "nobody");

        // Known type, missing target.
        let payload = serialization
            .serialize(&message(Pid::new("a", "b")), SERIALIZER_ID_BINARY)
            .unwrap();
        let mut builder = MessageBatchBuilder::new();
        builder.push(
            &Pid::new(system.address(), "still-nobody"),
            &payload.type_name,
            SERIALIZER_ID_BINARY,
            payload.data,
            None,
            None,
        );
        reader.handle_batch(builder.build());

        let event = tokio::time::timeout(Duration::from_secs(5), dead_letters.recv())
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(event.target.id, "still-nobody");
    }

    #[tokio::test]
    async fn stop_control_stops_the_target() {
        let system = ActorSystem::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let props = Props::from_producer(move || Probe { tx: tx.clone() });
        let victim = system.spawn_named(&props, "victim").unwrap();

        let (watcher_tx, mut watcher_rx) = mpsc::unbounded_channel();
        let watcher_props = Props::from_producer(move || Probe {
            tx: watcher_tx.clone(),
        });
        let watcher = system.spawn_named(&watcher_props, "observer").unwrap();
        system.send_system(&victim, SystemMessage::Watch { watcher });

        let (reader, serialization) = reader_for(&system);
        let payload = serialization
            .serialize(&message(StopActor), SERIALIZER_ID_BINARY)
            .unwrap();
        let mut builder = MessageBatchBuilder::new();
        builder.push(
            &victim,
            &payload.type_name,
            SERIALIZER_ID_BINARY,
            payload.data,
            None,
            None,
        );
        reader.handle_batch(builder.build());

        let envelope = tokio::time::timeout(Duration::from_secs(5), watcher_rx.recv())
            .await
            .expect("timed out")
            .unwrap();
        let terminated = envelope.message_as::<Terminated>().unwrap();
        assert_eq!(terminated.who, victim);
        assert!(!terminated.address_terminated);
        assert!(rx.try_recv().is_err());
    }
}
