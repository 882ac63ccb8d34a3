use std::{sync::Arc, time::Duration};

use hawser_driver::{DriverEvent, DriverFactory, RelayDriver};
use hawser_relay::{JoinCode, RelayProvider};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::{
    connection::Connection,
    error::ClientError,
    events::ClientEvent,
    peer::{DriverCell, SendPort},
};

/// Default window for an outbound attempt to become established.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(6000);

/// Client tunables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a connect attempt may stay un-established before
    /// [`ClientEvent::ConnectionFailed`] is raised.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { connect_timeout: DEFAULT_CONNECT_TIMEOUT }
    }
}

/// Player-side adapter: one outbound relay connection.
///
/// Lifecycle: [`prepare_connect`](Self::prepare_connect) resolves the join
/// code and binds a driver, [`connect`](Self::connect) starts the attempt
/// and arms the connect watchdog, [`poll`](Self::poll) drains events once
/// per tick, [`disconnect`](Self::disconnect) returns to idle.
pub struct Client<R, F>
where
    R: RelayProvider,
    F: DriverFactory,
{
    relay: R,
    drivers: F,
    config: ClientConfig,
    driver: DriverCell<F::Driver>,
    send_port: Arc<dyn SendPort>,
    connection: Option<Connection>,
    /// Cancellation side of the running watchdog, if any.
    watchdog: Option<oneshot::Sender<()>>,
    /// Watchdog-to-poll channel. Unbounded: at most one event per attempt.
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl<R, F> Client<R, F>
where
    R: RelayProvider,
    F: DriverFactory,
{
    /// Client with the default six second connect timeout.
    pub fn new(relay: R, drivers: F) -> Self {
        Self::with_config(relay, drivers, ClientConfig::default())
    }

    pub fn with_config(relay: R, drivers: F, config: ClientConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = DriverCell::empty();
        let send_port: Arc<dyn SendPort> = Arc::new(driver.clone());
        Self {
            relay,
            drivers,
            config,
            driver,
            send_port,
            connection: None,
            watchdog: None,
            events_tx,
            events_rx,
        }
    }

    /// The active connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_connected)
    }

    /// Resolve `join_code` through the relay service and bind a driver for
    /// the endpoint it grants.
    ///
    /// Fails fast on an empty code without touching the service. On any
    /// failure the client is left exactly as it was.
    pub async fn prepare_connect(&mut self, join_code: &str) -> Result<(), ClientError> {
        if self.has_live_connection() {
            return Err(ClientError::AlreadyConnected);
        }
        if join_code.is_empty() {
            error!("cannot join a relay session with an empty join code");
            return Err(ClientError::EmptyJoinCode);
        }

        let code = JoinCode::new(join_code);
        let grant = match self.relay.join(&code).await {
            Ok(grant) => grant,
            Err(error) => {
                error!(%error, %code, "failed to join relay allocation");
                return Err(error.into());
            }
        };

        let mut driver = match self.drivers.create_driver(&grant.endpoint) {
            Ok(driver) => driver,
            Err(error) => {
                error!(%error, "failed to create player driver");
                return Err(error.into());
            }
        };
        if let Err(error) = driver.bind() {
            error!(%error, "failed to bind player driver");
            return Err(error.into());
        }

        info!(allocation = %grant.endpoint.allocation, "player driver bound to relay server");
        self.driver.install(driver);
        Ok(())
    }

    /// Start the connection attempt on the driver prepared by
    /// [`prepare_connect`](Self::prepare_connect) and arm the watchdog.
    ///
    /// Synchronous; the outcome arrives through [`poll`](Self::poll) as
    /// [`ClientEvent::Connected`] or [`ClientEvent::ConnectionFailed`].
    ///
    /// # Panics
    ///
    /// The watchdog is spawned onto the ambient tokio runtime, so this must
    /// be called from within one.
    pub fn connect(&mut self) -> Result<Connection, ClientError> {
        if self.has_live_connection() {
            return Err(ClientError::AlreadyConnected);
        }

        let handle = match self.driver.with(|driver| driver.connect()) {
            Some(Ok(handle)) => handle,
            Some(Err(error)) => {
                error!(%error, "failed to connect to relay host");
                return Err(error.into());
            }
            None => return Err(ClientError::NotPrepared),
        };

        let connection = Connection::outbound(handle, Arc::clone(&self.send_port));
        self.arm_watchdog(connection.clone());
        debug!(%handle, timeout_ms = self.config.connect_timeout.as_millis() as u64,
            "connect attempt started");
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    /// Drain everything that happened since the last tick: watchdog
    /// completions first, then one driver pump and the pending driver events
    /// for the active connection.
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }

        let Some(connection) = self.connection.clone() else {
            return events;
        };
        let Some(handle) = connection.handle() else {
            // Slot already closed; the wrapper sticks around until
            // `disconnect` resets to idle.
            return events;
        };

        let popped = self
            .driver
            .with(|driver| {
                if !driver.is_bound() {
                    return Vec::new();
                }
                driver.pump();
                let mut popped = Vec::new();
                while let Some(event) = driver.pop_event(handle) {
                    popped.push(event);
                }
                popped
            })
            .unwrap_or_default();

        for event in popped {
            match event {
                DriverEvent::Connected => {
                    connection.mark_established();
                    self.cancel_watchdog();
                    info!(%handle, "connected to relay host");
                    events.push(ClientEvent::Connected { connection: connection.clone() });
                }
                DriverEvent::Data(payload) => {
                    events.push(ClientEvent::Data { connection: connection.clone(), payload });
                }
                DriverEvent::Disconnected(reason) => {
                    debug!(%handle, %reason, "relay host connection closed");
                    connection.close();
                    self.cancel_watchdog();
                    events.push(ClientEvent::Disconnected {
                        connection: connection.clone(),
                        reason,
                    });
                }
            }
        }
        events
    }

    /// Tear down the active connection, if any, and return to idle.
    pub fn disconnect(&mut self) {
        self.cancel_watchdog();
        let Some(connection) = self.connection.take() else {
            return;
        };
        if let Some(handle) = connection.handle() {
            if let Some(Err(error)) = self.driver.with(|driver| driver.disconnect(handle)) {
                debug!(%handle, %error, "driver disconnect failed");
            }
            debug!(%handle, "disconnected from relay host");
        }
        connection.close();
    }

    fn has_live_connection(&self) -> bool {
        self.connection.as_ref().is_some_and(|connection| !connection.is_closed())
    }

    fn arm_watchdog(&mut self, connection: Connection) {
        self.cancel_watchdog();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        tokio::spawn(connect_watchdog(
            connection,
            self.config.connect_timeout,
            self.events_tx.clone(),
            cancel_rx,
        ));
        self.watchdog = Some(cancel_tx);
    }

    fn cancel_watchdog(&mut self) {
        if let Some(cancel) = self.watchdog.take() {
            // The task may already be gone; that is fine.
            let _ = cancel.send(());
        }
    }
}

/// One-shot timer for a single connect attempt.
///
/// Fires after `timeout` and raises [`ClientEvent::ConnectionFailed`] if the
/// connection is still not established by then. Cancelled when the attempt
/// succeeds, on local disconnect, and when the client is dropped. The
/// establishment check makes a late fire harmless even if cancellation loses
/// the race.
async fn connect_watchdog(
    connection: Connection,
    timeout: Duration,
    events: mpsc::UnboundedSender<ClientEvent>,
    cancel: oneshot::Receiver<()>,
) {
    tokio::select! {
        biased;
        _ = cancel => {}
        _ = tokio::time::sleep(timeout) => {
            if !connection.is_connected() {
                debug!(id = %connection.id(), timeout_ms = timeout.as_millis() as u64,
                    "connect attempt timed out");
                let _ = events.send(ClientEvent::ConnectionFailed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hawser_test_utils::MemoryRelay;

    fn test_client(relay: &MemoryRelay) -> Client<MemoryRelay, MemoryRelay> {
        Client::new(relay.clone(), relay.clone())
    }

    #[tokio::test]
    async fn test_empty_join_code_fails_before_any_relay_call() {
        let relay = MemoryRelay::new();
        let mut client = test_client(&relay);

        let result = client.prepare_connect("").await;
        assert_matches!(result, Err(ClientError::EmptyJoinCode));
        assert_eq!(relay.join_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_join_code_is_reported() {
        let relay = MemoryRelay::new();
        let mut client = test_client(&relay);

        let result = client.prepare_connect("NOSUCH").await;
        assert_matches!(result, Err(ClientError::Relay(_)));
        assert_eq!(relay.join_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_without_prepare_is_rejected() {
        let relay = MemoryRelay::new();
        let mut client = test_client(&relay);

        assert_matches!(client.connect(), Err(ClientError::NotPrepared));
    }

    #[tokio::test]
    async fn test_bind_failure_surfaces_and_leaves_client_unprepared() {
        let relay = MemoryRelay::new();
        let allocation = relay.allocate(2).await.unwrap();
        let code = relay.join_code(allocation.id).await.unwrap();
        relay.fail_bind(true);

        let mut client = test_client(&relay);
        let result = client.prepare_connect(code.as_str()).await;
        assert_matches!(result, Err(ClientError::Driver(_)));
        assert_matches!(client.connect(), Err(ClientError::NotPrepared));
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_and_allows_a_retry() {
        let relay = MemoryRelay::new();
        let allocation = relay.allocate(2).await.unwrap();
        let code = relay.join_code(allocation.id).await.unwrap();

        let mut client = test_client(&relay);
        client.prepare_connect(code.as_str()).await.unwrap();

        relay.fail_connect(true);
        assert_matches!(client.connect(), Err(ClientError::Driver(_)));
        assert!(client.connection().is_none());
        // The prepared driver survives the refusal, so the next attempt can
        // go straight to connect.
        relay.fail_connect(false);
        client.connect().unwrap();
    }

    #[tokio::test]
    async fn test_second_connect_while_attempt_is_live_is_rejected() {
        let relay = MemoryRelay::new();
        let allocation = relay.allocate(2).await.unwrap();
        let code = relay.join_code(allocation.id).await.unwrap();

        let mut client = test_client(&relay);
        client.prepare_connect(code.as_str()).await.unwrap();
        client.connect().unwrap();

        assert_matches!(client.connect(), Err(ClientError::AlreadyConnected));
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_a_noop() {
        let relay = MemoryRelay::new();
        let mut client = test_client(&relay);

        client.disconnect();
        assert!(client.connection().is_none());
        assert!(client.poll().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_resets_to_idle() {
        let relay = MemoryRelay::new();
        let allocation = relay.allocate(2).await.unwrap();
        let code = relay.join_code(allocation.id).await.unwrap();

        let mut client = test_client(&relay);
        client.prepare_connect(code.as_str()).await.unwrap();
        let connection = client.connect().unwrap();

        client.disconnect();
        assert!(connection.is_closed());
        assert!(client.connection().is_none());
        // Idle again: a fresh prepare + connect is allowed.
        client.prepare_connect(code.as_str()).await.unwrap();
        client.connect().unwrap();
    }
}
