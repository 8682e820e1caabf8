//! Remote Messaging
//!
//! Lets actors on one node address, invoke, watch, and spawn actors on
//! another. One endpoint — a writer/watcher actor pair — owns each peer
//! connection: the writer batches outbound deliveries over a framed TCP
//! stream, the watcher keeps the cross-node liveness table and synthesizes
//! terminations when the peer is lost. The reader side accepts streams,
//! unpacks batches, and feeds the local kernel.
//!
//! ```no_run
//! use lattice_actors::ActorSystem;
//! use lattice_network::{Remote, RemoteConfig};
//!
//! # async fn start() -> Result<(), lattice_network::NetError> {
//! let system = ActorSystem::new();
//! let remote = Remote::new(system, RemoteConfig::default().with_port(4020));
//! let address = remote.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod activator;
pub mod config;
mod endpoint_manager;
mod endpoint_reader;
mod endpoint_watcher;
mod endpoint_writer;
pub mod error;
pub mod messages;
pub mod remote;
mod transport;
mod writer_mailbox;

pub use activator::ACTIVATOR_NAME;
pub use config::RemoteConfig;
pub use error::{NetError, Result};
pub use messages::{
    EndpointConnectedEvent, EndpointTerminatedEvent, RemoteDeliver, RemoteDeliverBatch,
    RemoteTerminate, RemoteUnwatch, RemoteWatch,
};
pub use remote::Remote;
