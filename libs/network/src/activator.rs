//! Activator
//!
//! The well-known actor every node runs for remote spawn. A pid request
//! names a kind from the node's configured kinds map and a process name;
//! the activator spawns the kind's props under that name (or a generated
//! one) and replies with the pid and a status. Name conflicts are
//! non-fatal: the reply carries the existing pid.

use crate::config::RemoteConfig;
use async_trait::async_trait;
use lattice_actors::{Actor, ActorError, ActorSystem, Context};
use lattice_types::{message, ActorPidRequest, ActorPidResponse, MessageEnvelope, ResponseStatus};
use std::sync::Arc;
use tracing::{info, warn};

/// Registry name the activator is reachable under on every node.
pub const ACTIVATOR_NAME: &str = "activator";

pub(crate) struct Activator {
    system: Arc<ActorSystem>,
    config: Arc<RemoteConfig>,
}

impl Activator {
    pub(crate) fn new(system: Arc<ActorSystem>, config: Arc<RemoteConfig>) -> Self {
        Self { system, config }
    }

    fn spawn_kind(&self, request: &ActorPidRequest) -> ActorPidResponse {
        let Some(props) = self.config.kind(&request.kind) else {
            warn!(kind = %request.kind, "remote spawn for unknown kind");
            return ActorPidResponse::error(ResponseStatus::Error);
        };

        let name = if request.name.is_empty() {
            self.system.process_registry().next_id()
        } else {
            request.name.clone()
        };

        match self.system.spawn_named(props, &name) {
            Ok(pid) => {
                info!(kind = %request.kind, actor = %pid, "remotely spawned actor");
                ActorPidResponse::ok(pid)
            }
            Err(ActorError::ProcessNameAlreadyExist { existing, name }) => {
                warn!(kind = %request.kind, name, "remote spawn name conflict");
                ActorPidResponse {
                    pid: Some(existing),
                    status_code: ResponseStatus::ProcessNameAlreadyExist.code(),
                }
            }
            Err(e) => {
                warn!(kind = %request.kind, error = %e, "remote spawn failed");
                ActorPidResponse::error(ResponseStatus::Error)
            }
        }
    }
}

#[async_trait]
impl Actor for Activator {
    async fn receive(
        &mut self,
        ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        if let Some(request) = envelope.message_as::<ActorPidRequest>() {
            let response = self.spawn_kind(request);
            ctx.respond(message(response));
        }
        Ok(())
    }
}
