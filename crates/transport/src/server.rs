use std::sync::Arc;

use hawser_driver::{DriverEvent, DriverFactory, RelayDriver};
use hawser_relay::{HostAllocation, JoinCode, RelayProvider};
use tracing::{debug, error, info, warn};

use crate::{
    connection::Connection,
    error::ServerError,
    events::ServerEvent,
    peer::{DriverCell, SendPort},
    registry::ConnectionRegistry,
};

/// Host-side adapter: accepts relay connections and tracks them in a
/// registry keyed by driver handle.
///
/// Lifecycle: [`prepare_start`](Self::prepare_start) reserves relay capacity
/// and fetches the join code, [`start`](Self::start) brings the driver up,
/// [`poll`](Self::poll) drains one tick, [`shutdown`](Self::shutdown) tears
/// everything down.
pub struct Server<R, F>
where
    R: RelayProvider,
    F: DriverFactory,
{
    relay: R,
    drivers: F,
    driver: DriverCell<F::Driver>,
    send_port: Arc<dyn SendPort>,
    allocation: Option<HostAllocation>,
    join_code: Option<JoinCode>,
    /// Exists from the moment an allocation succeeds; `None` before.
    registry: Option<ConnectionRegistry>,
}

impl<R, F> Server<R, F>
where
    R: RelayProvider,
    F: DriverFactory,
{
    pub fn new(relay: R, drivers: F) -> Self {
        let driver = DriverCell::empty();
        let send_port: Arc<dyn SendPort> = Arc::new(driver.clone());
        Self {
            relay,
            drivers,
            driver,
            send_port,
            allocation: None,
            join_code: None,
            registry: None,
        }
    }

    /// Join code players use to reach this host, once fetched.
    pub fn join_code(&self) -> Option<&JoinCode> {
        self.join_code.as_ref()
    }

    /// Whether the host driver is up.
    pub fn is_started(&self) -> bool {
        self.driver.is_installed()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.as_ref().map_or(0, ConnectionRegistry::len)
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.registry.as_ref().map_or_else(Vec::new, ConnectionRegistry::connections)
    }

    /// Reserve relay capacity for up to `max_connections` inbound
    /// connections, then fetch the shareable join code.
    ///
    /// On success the connection registry exists and is empty. A join code
    /// failure is logged and leaves [`join_code`](Self::join_code) unset
    /// without undoing the allocation; [`start`](Self::start) still works.
    pub async fn prepare_start(&mut self, max_connections: u32) -> Result<(), ServerError> {
        let allocation = match self.relay.allocate(max_connections).await {
            Ok(allocation) => allocation,
            Err(error) => {
                error!(%error, "failed to create relay allocation");
                return Err(error.into());
            }
        };
        info!(allocation = %allocation.id, max_connections, "relay allocation created");

        self.registry = Some(ConnectionRegistry::new());
        let allocation_id = allocation.id;
        self.allocation = Some(allocation);

        match self.relay.join_code(allocation_id).await {
            Ok(code) => {
                info!(%code, "relay join code ready");
                self.join_code = Some(code);
            }
            Err(error) => {
                warn!(%error, "failed to fetch relay join code");
            }
        }
        Ok(())
    }

    /// Create, bind, and listen on the host driver for the prepared
    /// allocation. Bind failure is terminal: listen is not attempted.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.driver.is_installed() {
            return Err(ServerError::AlreadyStarted);
        }
        let Some(allocation) = &self.allocation else {
            return Err(ServerError::NotPrepared);
        };

        let mut driver = match self.drivers.create_driver(&allocation.endpoint) {
            Ok(driver) => driver,
            Err(error) => {
                error!(%error, "failed to create host driver");
                return Err(error.into());
            }
        };
        if let Err(error) = driver.bind() {
            error!(%error, "failed to bind host driver");
            return Err(error.into());
        }
        if let Err(error) = driver.listen() {
            error!(%error, "failed to start listening for relay connections");
            return Err(error.into());
        }

        info!(allocation = %allocation.id, "host driver bound and listening");
        self.driver.install(driver);
        Ok(())
    }

    /// Drain one tick, in strict order: prune stale registry entries, accept
    /// pending inbound connections, then dispatch pending driver events per
    /// connection.
    ///
    /// A no-op unless the driver is up and the registry exists.
    pub fn poll(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        let pumped = self
            .driver
            .with(|driver| {
                let bound = driver.is_bound();
                if bound {
                    driver.pump();
                }
                bound
            })
            .unwrap_or(false);
        if !pumped {
            return events;
        }
        let Some(registry) = self.registry.as_mut() else {
            return events;
        };

        // Prune first so a handle the driver reuses this tick cannot collide
        // with a dead entry.
        for handle in registry.prune_stale() {
            debug!(%handle, "stale connection removed");
        }

        // Accept everything pending.
        while let Some(accepted) = self.driver.with(|driver| driver.accept()).flatten() {
            let connection = Connection::accepted(accepted, Arc::clone(&self.send_port));
            debug!(handle = %accepted, "inbound connection accepted");
            registry.insert(connection.clone());
            events.push(ServerEvent::Connected { connection });
        }

        // Dispatch per connection. Every surviving entry is active here:
        // pruning ran first and closures only happen below.
        for handle in registry.handles() {
            let Some(connection) = registry.get(handle).cloned() else {
                continue;
            };
            debug_assert!(!connection.is_closed(), "closed connection survived pruning");

            while let Some(event) = self.driver.with(|driver| driver.pop_event(handle)).flatten() {
                match event {
                    DriverEvent::Connected => {
                        // Accepted connections are established from the
                        // start; nothing to update.
                    }
                    DriverEvent::Data(payload) => {
                        events.push(ServerEvent::Data { connection: connection.clone(), payload });
                    }
                    DriverEvent::Disconnected(reason) => {
                        // Look the wrapper up by the same handle so retained
                        // clones observe the closure; removal is deferred to
                        // the next tick's pruning.
                        if let Some(entry) = registry.get(handle) {
                            debug!(%handle, %reason, "connection disconnected");
                            events.push(ServerEvent::Disconnected {
                                connection: entry.clone(),
                                reason,
                            });
                            entry.close();
                        }
                    }
                }
            }
        }
        events
    }

    /// Disconnect one connection at the driver level and invalidate its
    /// registry entry in place. The entry is removed by the next poll's
    /// pruning pass; no event is emitted for a host-initiated close.
    pub fn close(&mut self, connection: &Connection) {
        let Some(registry) = self.registry.as_ref() else {
            return;
        };
        let Some(entry) = registry.get(connection.id()).cloned() else {
            debug!(id = %connection.id(), "close ignored, connection is not registered");
            return;
        };
        if let Some(handle) = entry.handle() {
            if let Some(Err(error)) = self.driver.with(|driver| driver.disconnect(handle)) {
                debug!(%handle, %error, "driver disconnect failed");
            }
            debug!(%handle, "connection closed by host");
        }
        entry.close();
    }

    /// Tear the server down.
    ///
    /// With an empty (or absent) registry this is a no-op: nothing is
    /// disconnected and the driver stays up. Otherwise every connection is
    /// disconnected at the driver level, the registry is cleared, and the
    /// driver is released. No [`ServerEvent::Disconnected`] is emitted for
    /// host-initiated teardown; the host already knows.
    pub fn shutdown(&mut self) {
        let Some(registry) = self.registry.as_mut() else {
            return;
        };
        if registry.is_empty() {
            debug!("shutdown skipped, no registered connections");
            return;
        }

        for connection in registry.connections() {
            if let Some(handle) = connection.handle() {
                if let Some(Err(error)) = self.driver.with(|driver| driver.disconnect(handle)) {
                    debug!(%handle, %error, "driver disconnect failed during shutdown");
                }
            }
            connection.close();
        }
        registry.clear();
        self.driver.release();
        info!("host driver released");
    }
}
