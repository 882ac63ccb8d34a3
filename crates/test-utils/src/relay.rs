use std::sync::Arc;

use async_trait::async_trait;
use hawser_driver::{DriverError, DriverFactory};
use hawser_relay::{
    AllocationId, HostAllocation, JoinCode, JoinGrant, RelayEndpoint, RelayError, RelayProvider,
};
use parking_lot::Mutex;

use crate::{driver::MemoryDriver, hub::HubState};

/// In-memory relay service and driver factory over one shared hub.
///
/// Clones share the hub, so a host and any number of players built from
/// clones of the same `MemoryRelay` reach each other. Failure injection
/// flags and call counters make boundary behavior assertable.
#[derive(Clone)]
pub struct MemoryRelay {
    hub: Arc<Mutex<HubState>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self { hub: Arc::new(Mutex::new(HubState::default())) }
    }

    // ========================================================================
    // Failure injection
    // ========================================================================

    /// Fail the next `allocate` call, then behave normally again.
    pub fn fail_next_allocation(&self) {
        self.hub.lock().fail_next_allocation = true;
    }

    pub fn fail_join_codes(&self, fail: bool) {
        self.hub.lock().fail_join_codes = fail;
    }

    pub fn fail_bind(&self, fail: bool) {
        self.hub.lock().fail_bind = fail;
    }

    pub fn fail_listen(&self, fail: bool) {
        self.hub.lock().fail_listen = fail;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.hub.lock().fail_connect = fail;
    }

    pub fn refuse_sends(&self, refuse: bool) {
        self.hub.lock().refuse_sends = refuse;
    }

    // ========================================================================
    // Call counters
    // ========================================================================

    pub fn allocate_calls(&self) -> u64 {
        self.hub.lock().allocate_calls
    }

    pub fn join_calls(&self) -> u64 {
        self.hub.lock().join_calls
    }

    pub fn join_code_calls(&self) -> u64 {
        self.hub.lock().join_code_calls
    }

    pub fn bind_calls(&self) -> u64 {
        self.hub.lock().bind_calls
    }

    pub fn listen_calls(&self) -> u64 {
        self.hub.lock().listen_calls
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayProvider for MemoryRelay {
    async fn allocate(&self, max_connections: u32) -> Result<HostAllocation, RelayError> {
        let id = self.hub.lock().allocate(max_connections)?;
        Ok(HostAllocation { id, endpoint: memory_endpoint(id), max_connections })
    }

    async fn join(&self, code: &JoinCode) -> Result<JoinGrant, RelayError> {
        let allocation = self.hub.lock().grant_for_code(code.as_str())?;
        Ok(JoinGrant { endpoint: memory_endpoint(allocation) })
    }

    async fn join_code(&self, allocation: AllocationId) -> Result<JoinCode, RelayError> {
        let code = self.hub.lock().join_code(allocation)?;
        Ok(JoinCode::new(code))
    }
}

impl DriverFactory for MemoryRelay {
    type Driver = MemoryDriver;

    fn create_driver(&self, endpoint: &RelayEndpoint) -> Result<MemoryDriver, DriverError> {
        if !self.hub.lock().has_allocation(endpoint.allocation) {
            return Err(DriverError::Create(format!("unknown allocation {}", endpoint.allocation)));
        }
        Ok(MemoryDriver::new(Arc::clone(&self.hub), endpoint.clone()))
    }
}

/// Endpoint routed purely by allocation id; host and port are decorative.
fn memory_endpoint(allocation: AllocationId) -> RelayEndpoint {
    RelayEndpoint { allocation, host: "relay.local".into(), port: 7777 }
}
