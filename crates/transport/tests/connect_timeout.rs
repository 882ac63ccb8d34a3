//! Connect watchdog behavior under a paused tokio clock.
//!
//! The driver side uses the in-memory relay with a host that simply never
//! polls, so an attempt stays un-established for as long as a test wants.

use std::time::Duration;

use assert_matches::assert_matches;
use hawser_test_utils::MemoryRelay;
use hawser_transport::{Client, ClientConfig, ClientEvent, Server, DEFAULT_CONNECT_TIMEOUT};
use tokio::{task::yield_now, time::advance};

type MemClient = Client<MemoryRelay, MemoryRelay>;
type MemServer = Server<MemoryRelay, MemoryRelay>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// A started host and a client prepared against its join code. No attempt
/// is started yet; tests own the connect call and the clock.
async fn prepared_pair(relay: &MemoryRelay) -> (MemServer, MemClient) {
    let mut server = Server::new(relay.clone(), relay.clone());
    server.prepare_start(2).await.unwrap();
    server.start().unwrap();

    let code = server.join_code().unwrap().clone();
    let mut client = Client::new(relay.clone(), relay.clone());
    client.prepare_connect(code.as_str()).await.unwrap();
    (server, client)
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_fires_once_at_the_deadline() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (_server, mut client) = prepared_pair(&relay).await;

    client.connect().unwrap();
    // Let the watchdog task register its timer before the clock moves.
    yield_now().await;

    advance(DEFAULT_CONNECT_TIMEOUT - Duration::from_millis(1)).await;
    yield_now().await;
    assert!(client.poll().is_empty());

    advance(Duration::from_millis(1)).await;
    yield_now().await;
    assert_eq!(client.poll(), vec![ClientEvent::ConnectionFailed]);

    // One shot per attempt.
    advance(DEFAULT_CONNECT_TIMEOUT).await;
    yield_now().await;
    assert!(client.poll().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_acceptance_just_before_the_deadline_cancels_the_watchdog() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (mut server, mut client) = prepared_pair(&relay).await;

    client.connect().unwrap();
    yield_now().await;

    advance(DEFAULT_CONNECT_TIMEOUT - Duration::from_millis(1)).await;
    assert_eq!(server.poll().len(), 1);
    let events = client.poll();
    assert_matches!(events.as_slice(), [ClientEvent::Connected { .. }]);
    assert!(client.is_connected());

    // Well past the deadline: the cancelled watchdog stays quiet.
    advance(DEFAULT_CONNECT_TIMEOUT * 2).await;
    yield_now().await;
    assert!(client.poll().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_acceptance_still_completes_after_the_failure_event() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (mut server, mut client) = prepared_pair(&relay).await;

    client.connect().unwrap();
    yield_now().await;

    advance(DEFAULT_CONNECT_TIMEOUT).await;
    yield_now().await;
    assert_eq!(client.poll(), vec![ClientEvent::ConnectionFailed]);

    // The watchdog only reports; the attempt itself is still live, so a
    // slow host can still complete it.
    assert_eq!(server.poll().len(), 1);
    let events = client.poll();
    assert_matches!(events.as_slice(), [ClientEvent::Connected { .. }]);
    assert!(client.is_connected());

    advance(DEFAULT_CONNECT_TIMEOUT).await;
    yield_now().await;
    assert!(client.poll().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_the_watchdog() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (_server, mut client) = prepared_pair(&relay).await;

    client.connect().unwrap();
    yield_now().await;

    client.disconnect();
    advance(DEFAULT_CONNECT_TIMEOUT * 2).await;
    yield_now().await;
    assert!(client.poll().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_each_attempt_arms_its_own_watchdog() {
    init_tracing();
    let relay = MemoryRelay::new();
    let (server, mut client) = prepared_pair(&relay).await;
    let code = server.join_code().unwrap().clone();

    client.connect().unwrap();
    yield_now().await;
    advance(Duration::from_millis(3000)).await;

    // Abandon the first attempt mid-window and start over.
    client.disconnect();
    client.prepare_connect(code.as_str()).await.unwrap();
    client.connect().unwrap();
    yield_now().await;

    // The first watchdog was cancelled; the second counts from its own start.
    advance(DEFAULT_CONNECT_TIMEOUT - Duration::from_millis(1)).await;
    yield_now().await;
    assert!(client.poll().is_empty());

    advance(Duration::from_millis(1)).await;
    yield_now().await;
    assert_eq!(client.poll(), vec![ClientEvent::ConnectionFailed]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_connect_timeout_is_honored() {
    init_tracing();
    let relay = MemoryRelay::new();
    let mut server = Server::new(relay.clone(), relay.clone());
    server.prepare_start(2).await.unwrap();
    server.start().unwrap();
    let code = server.join_code().unwrap().clone();

    let config = ClientConfig { connect_timeout: Duration::from_millis(250) };
    let mut client = Client::with_config(relay.clone(), relay.clone(), config);
    client.prepare_connect(code.as_str()).await.unwrap();
    client.connect().unwrap();
    yield_now().await;

    advance(Duration::from_millis(249)).await;
    yield_now().await;
    assert!(client.poll().is_empty());

    advance(Duration::from_millis(1)).await;
    yield_now().await;
    assert_eq!(client.poll(), vec![ClientEvent::ConnectionFailed]);
}
