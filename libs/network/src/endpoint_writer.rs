//! Endpoint Writer
//!
//! The actor that owns one outbound stream to one peer. On start it dials
//! the peer with retry and backoff, sends the one-time connect envelope, and
//! resumes its batching mailbox. Each delivery batch becomes one wire frame
//! with interned type names and targets. A failed write tears the endpoint
//! down: the writer emits the termination event to itself, the manager
//! observes it, and the mailbox drains the remainder to dead letters.

use crate::config::RemoteConfig;
use crate::messages::{EndpointConnectedEvent, EndpointTerminatedEvent, RemoteDeliverBatch};
use crate::transport::FramedConnection;
use async_trait::async_trait;
use lattice_actors::event_stream::DeadLetterEvent;
use lattice_actors::{Actor, ActorError, ActorSystem, Context, SupervisorDirective, SystemMessage};
use lattice_codec::SerializerRegistry;
use lattice_types::{ConnectRequest, MessageBatchBuilder, MessageEnvelope, RemoteFrame};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointState {
    Connecting,
    Connected,
    Suspended,
    Terminated,
}

pub(crate) struct EndpointWriter {
    address: String,
    config: Arc<RemoteConfig>,
    system: Arc<ActorSystem>,
    serialization: Arc<SerializerRegistry>,
    connection: Option<FramedConnection>,
    state: EndpointState,
}

impl EndpointWriter {
    pub(crate) fn new(
        address: String,
        config: Arc<RemoteConfig>,
        system: Arc<ActorSystem>,
        serialization: Arc<SerializerRegistry>,
    ) -> Self {
        Self {
            address,
            config,
            system,
            serialization,
            connection: None,
            state: EndpointState::Connecting,
        }
    }

    /// Dial the peer, honoring the retry/backoff policy. Exhausted retries
    /// terminate the endpoint rather than fail the actor.
    async fn connect_with_retries(&mut self, ctx: &Context) {
        let mut delay = self.config.retry_interval;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay *= self.config.retry_backoff_factor;
            }
            match FramedConnection::connect(
                &self.address,
                self.config.connect_timeout,
                self.config.max_frame_size,
            )
            .await
            {
                Ok(mut connection) => {
                    let connect = RemoteFrame::Connect(ConnectRequest {
                        address: self.system.address(),
                    });
                    match connection.write_frame(&connect).await {
                        Ok(()) => {
                            info!(peer = %self.address, attempt, "endpoint connected");
                            self.connection = Some(connection);
                            self.state = EndpointState::Connected;
                            // Un-suspend the batching mailbox, then let
                            // observers know the stream is up.
                            self.system
                                .send_system(ctx.self_pid(), SystemMessage::Resume);
                            self.system
                                .event_stream()
                                .publish_value(EndpointConnectedEvent {
                                    address: self.address.clone(),
                                });
                            return;
                        }
                        Err(e) => {
                            warn!(peer = %self.address, attempt, error = %e, "connect envelope failed");
                        }
                    }
                }
                Err(e) => {
                    warn!(peer = %self.address, attempt, error = %e, "connect attempt failed");
                }
            }
        }

        warn!(
            peer = %self.address,
            retries = self.config.max_retries,
            "connection attempts exhausted, terminating endpoint"
        );
        self.state = EndpointState::Terminated;
        self.system
            .event_stream()
            .publish_value(EndpointTerminatedEvent {
                address: self.address.clone(),
            });
    }

    async fn write_batch(
        &mut self,
        ctx: &Context,
        batch: &RemoteDeliverBatch,
    ) -> Result<(), ActorError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(ActorError::unavailable(format!(
                "no stream to {}",
                self.address
            )));
        };

        let mut builder = MessageBatchBuilder::new();
        for deliver in &batch.0 {
            match self
                .serialization
                .serialize(&deliver.message, deliver.serializer_id)
            {
                Ok(serialized) => builder.push(
                    &deliver.target,
                    &serialized.type_name,
                    deliver.serializer_id,
                    serialized.data,
                    deliver.sender.clone(),
                    deliver.header.clone(),
                ),
                Err(e) => {
                    // One unserializable message never takes the endpoint
                    // down; it dead-letters and the rest of the batch goes.
                    warn!(
                        peer = %self.address,
                        target = %deliver.target,
                        error = %e,
                        "dropping unserializable message"
                    );
                    self.system.event_stream().publish_value(DeadLetterEvent {
                        target: deliver.target.clone(),
                        message: deliver.message.clone(),
                        sender: deliver.sender.clone(),
                    });
                }
            }
        }
        if builder.is_empty() {
            return Ok(());
        }

        let frame = RemoteFrame::Batch(builder.build());
        match connection.write_frame(&frame).await {
            Ok(()) => {
                debug!(peer = %self.address, messages = batch.0.len(), "batch written");
                Ok(())
            }
            Err(e) => {
                warn!(peer = %self.address, error = %e, "batch write failed");
                self.state = EndpointState::Suspended;
                self.connection = None;
                // Tear down through the user queue so the event is ordered
                // behind nothing and delivered individually.
                self.system.send(
                    ctx.self_pid(),
                    MessageEnvelope::wrap(EndpointTerminatedEvent {
                        address: self.address.clone(),
                    }),
                );
                Err(ActorError::unavailable(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Actor for EndpointWriter {
    async fn started(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        debug!(peer = %self.address, "endpoint writer starting");
        self.connect_with_retries(ctx).await;
        Ok(())
    }

    async fn receive(
        &mut self,
        ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        if let Some(batch) = envelope.message_as::<RemoteDeliverBatch>() {
            return self.write_batch(ctx, batch).await;
        }
        if let Some(event) = envelope.message_as::<EndpointTerminatedEvent>() {
            self.state = EndpointState::Terminated;
            if let Some(mut connection) = self.connection.take() {
                connection.shutdown().await;
            }
            self.system.event_stream().publish_value(event.clone());
            return Ok(());
        }
        debug!(peer = %self.address, "unexpected message at endpoint writer");
        Ok(())
    }

    async fn stopped(&mut self, _ctx: &mut Context) -> Result<(), ActorError> {
        if let Some(mut connection) = self.connection.take() {
            connection.shutdown().await;
        }
        debug!(peer = %self.address, state = ?self.state, "endpoint writer stopped");
        self.state = EndpointState::Terminated;
        Ok(())
    }

    async fn on_error(&mut self, _ctx: &mut Context, error: &ActorError) -> SupervisorDirective {
        error!(peer = %self.address, error = %error, "endpoint writer failure");
        self.system
            .event_stream()
            .publish_value(EndpointTerminatedEvent {
                address: self.address.clone(),
            });
        SupervisorDirective::Stop
    }
}
