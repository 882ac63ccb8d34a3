use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    sync::Arc,
};

use hawser_driver::{ConnectionHandle, DriverError, DriverEvent, RelayDriver};
use hawser_relay::RelayEndpoint;
use parking_lot::Mutex;

use crate::hub::{HubState, Side};

/// Queue-based loopback driver.
///
/// Every driver created from the same [`MemoryRelay`](crate::MemoryRelay)
/// shares one hub; links are routed by the allocation id in the endpoint.
/// `pump` moves hub mailboxes into per-connection event queues, so events
/// become visible tick by tick the way a real driver's would. There is no
/// framing, no reliability, and no protocol here, just queues.
#[derive(Debug)]
pub struct MemoryDriver {
    hub: Arc<Mutex<HubState>>,
    endpoint: RelayEndpoint,
    /// Set by `listen` (host) or `connect` (player).
    role: Option<Side>,
    bound: bool,
    listening: bool,
    /// Links this driver speaks for, in handle order.
    handles: BTreeSet<ConnectionHandle>,
    /// Events moved out of the hub by `pump`, waiting for `pop_event`.
    queues: BTreeMap<ConnectionHandle, VecDeque<DriverEvent>>,
}

impl MemoryDriver {
    pub(crate) fn new(hub: Arc<Mutex<HubState>>, endpoint: RelayEndpoint) -> Self {
        Self {
            hub,
            endpoint,
            role: None,
            bound: false,
            listening: false,
            handles: BTreeSet::new(),
            queues: BTreeMap::new(),
        }
    }
}

impl RelayDriver for MemoryDriver {
    fn bind(&mut self) -> Result<(), DriverError> {
        self.hub.lock().bind_attempt()?;
        self.bound = true;
        Ok(())
    }

    fn listen(&mut self) -> Result<(), DriverError> {
        if !self.bound {
            return Err(DriverError::NotBound);
        }
        self.hub.lock().listen_attempt()?;
        self.role = Some(Side::Host);
        self.listening = true;
        Ok(())
    }

    fn connect(&mut self) -> Result<ConnectionHandle, DriverError> {
        if !self.bound {
            return Err(DriverError::NotBound);
        }
        let handle = self.hub.lock().open_link(self.endpoint.allocation)?;
        self.role = Some(Side::Player);
        self.handles.insert(handle);
        Ok(handle)
    }

    fn accept(&mut self) -> Option<ConnectionHandle> {
        if !self.listening {
            return None;
        }
        let handle = self.hub.lock().accept_link(self.endpoint.allocation)?;
        self.handles.insert(handle);
        Some(handle)
    }

    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), DriverError> {
        let side = self.side_for(connection)?;
        self.hub.lock().close_link(connection, side)
    }

    fn send(&mut self, connection: ConnectionHandle, payload: &[u8]) -> Result<(), DriverError> {
        let side = self.side_for(connection)?;
        self.hub.lock().send_on(connection, side, payload)
    }

    fn pump(&mut self) {
        let Some(side) = self.role else {
            return;
        };
        let mut hub = self.hub.lock();
        for handle in &self.handles {
            let drained = hub.drain_mailbox(*handle, side);
            if !drained.is_empty() {
                self.queues.entry(*handle).or_default().extend(drained);
            }
        }
    }

    fn pop_event(&mut self, connection: ConnectionHandle) -> Option<DriverEvent> {
        self.queues.get_mut(&connection).and_then(VecDeque::pop_front)
    }

    fn is_bound(&self) -> bool {
        self.bound
    }
}

impl MemoryDriver {
    fn side_for(&self, connection: ConnectionHandle) -> Result<Side, DriverError> {
        match self.role {
            Some(side) if self.handles.contains(&connection) => Ok(side),
            _ => Err(DriverError::InvalidConnection(connection)),
        }
    }
}
