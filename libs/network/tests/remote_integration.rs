//! Two-node integration tests: every node is a full remote instance in this
//! process, listening on its own ephemeral loopback port.

use async_trait::async_trait;
use lattice_actors::event_stream::DeadLetterEvent;
use lattice_actors::{Actor, ActorError, ActorSystem, Context, Props};
use lattice_codec::{JsonMessage, TypeManifest};
use lattice_network::{Remote, RemoteConfig};
use lattice_types::{message, MessageEnvelope, Pid, ResponseStatus, Terminated};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ping {
    message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pong {
    message: String,
}

fn test_manifest() -> TypeManifest {
    TypeManifest::new()
        .with_type::<Ping>("test.Ping")
        .with_type::<Pong>("test.Pong")
        .with_type::<u64>("test.Seq")
}

/// Replies `Pong { "<own address> <ping>" }` to every ping.
struct EchoActor;

#[async_trait]
impl Actor for EchoActor {
    async fn receive(
        &mut self,
        ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        if let Some(ping) = envelope.message_as::<Ping>() {
            ctx.respond(message(Pong {
                message: format!("{} {}", ctx.system().address(), ping.message),
            }));
        }
        Ok(())
    }
}

/// Watches a fixed pid from `started` and forwards terminations.
struct WatchingActor {
    target: Pid,
    terminations: mpsc::UnboundedSender<Terminated>,
}

/// Local command telling a [`WatchingActor`] to unwatch its target.
struct UnwatchNow;

#[async_trait]
impl Actor for WatchingActor {
    async fn started(&mut self, ctx: &mut Context) -> Result<(), ActorError> {
        ctx.watch(&self.target);
        Ok(())
    }

    async fn receive(
        &mut self,
        ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        if let Some(terminated) = envelope.message_as::<Terminated>() {
            let _ = self.terminations.send(terminated.clone());
        } else if envelope.message_as::<UnwatchNow>().is_some() {
            ctx.unwatch(&self.target);
        }
        Ok(())
    }
}

/// Forwards every envelope into a channel.
struct CollectorActor {
    tx: mpsc::UnboundedSender<MessageEnvelope>,
}

#[async_trait]
impl Actor for CollectorActor {
    async fn receive(
        &mut self,
        _ctx: &mut Context,
        envelope: MessageEnvelope,
    ) -> Result<(), ActorError> {
        let _ = self.tx.send(envelope);
        Ok(())
    }
}

/// Every test node binds and advertises loopback so peers in this process
/// can dial it back.
fn test_config() -> RemoteConfig {
    RemoteConfig::default().with_host("127.0.0.1")
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

async fn start_node(config: RemoteConfig) -> (Arc<ActorSystem>, Arc<Remote>, String) {
    init_tracing();
    let system = ActorSystem::new();
    let remote = Remote::new(system.clone(), config);
    remote.serialization().register_manifest(&test_manifest());
    let address = remote.start().await.expect("remote start");
    (system, remote, address)
}

async fn recv_terminated(
    rx: &mut mpsc::UnboundedReceiver<Terminated>,
    what: &str,
) -> Terminated {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .unwrap_or_else(|| panic!("channel closed waiting for {what}"))
}

#[tokio::test]
async fn echo_round_trip_across_nodes() {
    let (_system_a, remote_a, _address_a) = start_node(test_config()).await;
    let (system_b, _remote_b, address_b) = start_node(test_config()).await;

    system_b
        .spawn_named(&Props::from_producer(|| EchoActor), "EchoActorInstance")
        .unwrap();

    let target = Pid::new(address_b.clone(), "EchoActorInstance");
    let pong: Arc<Pong> = remote_a
        .system()
        .root()
        .request_async(
            &target,
            message(Ping {
                message: "Hello".to_string(),
            }),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert_eq!(pong.message, format!("{address_b} Hello"));
}

#[tokio::test]
async fn json_wrapped_messages_arrive_as_concrete_types() {
    let (_system_a, remote_a, _address_a) = start_node(test_config()).await;
    let (system_b, _remote_b, address_b) = start_node(test_config()).await;

    system_b
        .spawn_named(&Props::from_producer(|| EchoActor), "echo")
        .unwrap();

    let target = Pid::new(address_b.clone(), "echo");
    let pong: Arc<Pong> = remote_a
        .system()
        .root()
        .request_async(
            &target,
            message(JsonMessage::new("test.Ping", r#"{"message":"Hello"}"#)),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert_eq!(pong.message, format!("{address_b} Hello"));
}

#[tokio::test]
async fn unknown_remote_actor_times_out() {
    let (_system_a, remote_a, _address_a) = start_node(test_config()).await;
    let (_system_b, _remote_b, address_b) = start_node(test_config()).await;

    let target = Pid::new(address_b, "doesn't exist");
    let err = remote_a
        .system()
        .root()
        .request_async::<Pong>(
            &target,
            message(Ping {
                message: "anyone?".to_string(),
            }),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActorError::Timeout { .. }));
}

#[tokio::test]
async fn remote_spawn_creates_usable_actors() {
    let (_system_a, remote_a, _address_a) = start_node(test_config()).await;
    let config_b =
        test_config().with_kind("EchoActor", Props::from_producer(|| EchoActor));
    let (_system_b, _remote_b, address_b) = start_node(config_b).await;

    let name = uuid::Uuid::new_v4().to_string();
    let response = remote_a
        .spawn_named(&address_b, &name, "EchoActor", Duration::from_secs(5))
        .await;
    assert_eq!(response.status(), ResponseStatus::Ok);
    let pid = response.pid.clone().unwrap();
    assert_eq!(pid, Pid::new(address_b.clone(), name.clone()));

    let pong: Arc<Pong> = remote_a
        .system()
        .root()
        .request_async(
            &pid,
            message(Ping {
                message: "spawned".to_string(),
            }),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert_eq!(pong.message, format!("{address_b} spawned"));

    // Same name again: non-fatal, the existing pid comes back.
    let conflict = remote_a
        .spawn_named(&address_b, &name, "EchoActor", Duration::from_secs(5))
        .await;
    assert_eq!(conflict.status(), ResponseStatus::ProcessNameAlreadyExist);
    assert_eq!(conflict.pid, Some(pid));

    // Unknown kinds are an error, not a timeout.
    let unknown = remote_a
        .spawn_named(&address_b, "x", "NoSuchKind", Duration::from_secs(5))
        .await;
    assert_eq!(unknown.status(), ResponseStatus::Error);
}

#[tokio::test]
async fn watch_sees_remote_stop_exactly_once() {
    let (system_a, remote_a, _address_a) = start_node(test_config()).await;
    let (system_b, _remote_b, address_b) = start_node(test_config()).await;

    let (collector_tx, _collector_rx) = mpsc::unbounded_channel();
    let remote_pid = system_b
        .spawn_named(
            &Props::from_producer(move || CollectorActor {
                tx: collector_tx.clone(),
            }),
            "watched",
        )
        .unwrap();

    let (term_tx, mut term_rx) = mpsc::unbounded_channel();
    let watch_target = Pid::new(address_b, "watched");
    system_a
        .spawn_named(
            &Props::from_producer(move || WatchingActor {
                target: watch_target.clone(),
                terminations: term_tx.clone(),
            }),
            "local-watcher",
        )
        .unwrap();

    // Let the watch propagate to the peer before stopping.
    tokio::time::sleep(Duration::from_millis(300)).await;
    remote_a.system().root().stop(&remote_pid);

    let terminated = recv_terminated(&mut term_rx, "termination").await;
    assert_eq!(terminated.who.id, "watched");
    assert!(!terminated.address_terminated);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(term_rx.try_recv().is_err());
}

#[tokio::test]
async fn unwatch_is_selective_per_watcher() {
    let (system_a, remote_a, _address_a) = start_node(test_config()).await;
    let (system_b, _remote_b, address_b) = start_node(test_config()).await;

    let (collector_tx, _collector_rx) = mpsc::unbounded_channel();
    system_b
        .spawn_named(
            &Props::from_producer(move || CollectorActor {
                tx: collector_tx.clone(),
            }),
            "watched",
        )
        .unwrap();
    let watch_target = Pid::new(address_b, "watched");

    let (l1_tx, mut l1_rx) = mpsc::unbounded_channel();
    let l1_target = watch_target.clone();
    system_a
        .spawn_named(
            &Props::from_producer(move || WatchingActor {
                target: l1_target.clone(),
                terminations: l1_tx.clone(),
            }),
            "l1",
        )
        .unwrap();

    let (l2_tx, mut l2_rx) = mpsc::unbounded_channel();
    let l2_target = watch_target.clone();
    let l2 = system_a
        .spawn_named(
            &Props::from_producer(move || WatchingActor {
                target: l2_target.clone(),
                terminations: l2_tx.clone(),
            }),
            "l2",
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    system_a.send(&l2, MessageEnvelope::wrap(UnwatchNow));
    tokio::time::sleep(Duration::from_millis(300)).await;

    remote_a.system().root().stop(&watch_target);

    let terminated = recv_terminated(&mut l1_rx, "l1 termination").await;
    assert_eq!(terminated.who.id, "watched");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(l2_rx.try_recv().is_err());
}

#[tokio::test]
async fn unreachable_peer_turns_pending_sends_into_dead_letters() {
    let config = RemoteConfig::default()
        .with_max_retries(1)
        .with_retry_interval(Duration::from_millis(50))
        .with_connect_timeout(Duration::from_millis(500));
    let (system_a, _remote_a, _address_a) = start_node(config).await;

    let mut dead_letters = system_a.event_stream().subscribe::<DeadLetterEvent>();
    tokio::task::yield_now().await;

    // Nothing listens here; the endpoint exhausts its retries and drains.
    let target = Pid::new("127.0.0.1:9", "nobody");
    let sent = 5u64;
    for n in 0..sent {
        system_a.send(
            &target,
            MessageEnvelope::wrap(Ping {
                message: n.to_string(),
            }),
        );
    }

    let mut seen = 0u64;
    while seen < sent {
        let event = tokio::time::timeout(Duration::from_secs(10), dead_letters.recv())
            .await
            .expect("timed out waiting for dead letters")
            .expect("event stream closed");
        assert_eq!(event.target, target);
        assert!(event.message.downcast_ref::<Ping>().is_some());
        seen += 1;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(dead_letters.try_recv().is_err());
}

#[tokio::test]
async fn per_target_order_is_preserved_within_a_session() {
    let (system_a, _remote_a, _address_a) = start_node(test_config()).await;
    let (system_b, _remote_b, address_b) = start_node(test_config()).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    system_b
        .spawn_named(
            &Props::from_producer(move || CollectorActor { tx: tx.clone() }),
            "collector",
        )
        .unwrap();

    let target = Pid::new(address_b, "collector");
    let count = 200u64;
    for n in 0..count {
        system_a.send(&target, MessageEnvelope::wrap(n));
    }

    let mut received = Vec::with_capacity(count as usize);
    while received.len() < count as usize {
        let envelope = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for ordered messages")
            .unwrap();
        received.push(*envelope.message_as::<u64>().unwrap());
    }
    assert_eq!(received, (0..count).collect::<Vec<_>>());
}

#[tokio::test]
async fn shutdown_reports_and_clears_the_advertised_address() {
    let (_system, remote, address) = start_node(test_config()).await;
    assert_eq!(remote.advertised_address(), Some(address));

    remote.shutdown().await;
    assert_eq!(remote.advertised_address(), None);
}
