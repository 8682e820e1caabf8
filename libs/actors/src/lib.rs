//! Local Actor Kernel
//!
//! Message dispatch inside one node: processes and their registry, the
//! CAS-gated mailbox, actor cells with supervision, the event stream, and
//! request/response futures. The remote layer builds on the hooks exposed
//! here — spawn-by-props, send-to-local-pid, system-message injection,
//! watch/unwatch, dead letters, and the registry's remote-handler slot.

pub mod actor;
mod cell;
pub mod error;
pub mod event_stream;
pub mod mailbox;
pub mod message;
pub mod process;
pub mod props;
pub mod registry;
pub mod root;
pub mod system;

pub use actor::{Actor, Context};
pub use error::{ActorError, Result};
pub use event_stream::{DeadLetterEvent, EventStream};
pub use mailbox::{DefaultMailbox, Mailbox, MessageInvoker, DEFAULT_THROUGHPUT};
pub use message::{SupervisorDirective, SystemMessage};
pub use process::{FutureProcess, LocalProcess, Process};
pub use props::Props;
pub use registry::{ProcessRegistry, RemoteHandler};
pub use root::RootContext;
pub use system::ActorSystem;
