use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use hawser_driver::{ConnectionHandle, DisconnectReason, DriverError, DriverEvent};
use hawser_relay::{AllocationId, RelayError};
use rand::Rng;

const JOIN_CODE_LEN: usize = 6;

/// Which end of a link a driver speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Host,
    Player,
}

impl Side {
    fn other(self) -> Self {
        match self {
            Self::Host => Self::Player,
            Self::Player => Self::Host,
        }
    }
}

/// One player<->host link. The same handle identifies it on both ends.
#[derive(Debug, Default)]
struct Link {
    accepted: bool,
    closed: bool,
    to_host: VecDeque<DriverEvent>,
    to_player: VecDeque<DriverEvent>,
}

impl Link {
    fn mailbox_mut(&mut self, side: Side) -> &mut VecDeque<DriverEvent> {
        match side {
            Side::Host => &mut self.to_host,
            Side::Player => &mut self.to_player,
        }
    }
}

#[derive(Debug)]
struct AllocationEntry {
    join_code: Option<String>,
    /// Connect attempts waiting for the host to accept, oldest first.
    pending: VecDeque<ConnectionHandle>,
}

/// State shared by one [`MemoryRelay`](crate::MemoryRelay) and every driver
/// it created. Everything lives behind a single mutex; calls are short and
/// never block on each other.
#[derive(Debug, Default)]
pub(crate) struct HubState {
    next_allocation: u64,
    next_handle: u64,
    allocations: HashMap<AllocationId, AllocationEntry>,
    join_codes: HashMap<String, AllocationId>,
    links: HashMap<ConnectionHandle, Link>,

    // Failure injection.
    pub(crate) fail_next_allocation: bool,
    pub(crate) fail_join_codes: bool,
    pub(crate) fail_bind: bool,
    pub(crate) fail_listen: bool,
    pub(crate) fail_connect: bool,
    pub(crate) refuse_sends: bool,

    // Call counters, for asserting what a component did (or avoided doing).
    pub(crate) allocate_calls: u64,
    pub(crate) join_calls: u64,
    pub(crate) join_code_calls: u64,
    pub(crate) bind_calls: u64,
    pub(crate) listen_calls: u64,
}

// ============================================================================
// Relay service side
// ============================================================================

impl HubState {
    pub(crate) fn allocate(&mut self, _max_connections: u32) -> Result<AllocationId, RelayError> {
        self.allocate_calls += 1;
        if self.fail_next_allocation {
            self.fail_next_allocation = false;
            return Err(RelayError::Allocation("injected failure".into()));
        }
        self.next_allocation += 1;
        let id = AllocationId::new(self.next_allocation);
        self.allocations
            .insert(id, AllocationEntry { join_code: None, pending: VecDeque::new() });
        Ok(id)
    }

    pub(crate) fn grant_for_code(&mut self, code: &str) -> Result<AllocationId, RelayError> {
        self.join_calls += 1;
        self.join_codes.get(code).copied().ok_or(RelayError::UnknownJoinCode)
    }

    pub(crate) fn join_code(&mut self, allocation: AllocationId) -> Result<String, RelayError> {
        self.join_code_calls += 1;
        if self.fail_join_codes {
            return Err(RelayError::JoinCode("injected failure".into()));
        }
        let entry = self
            .allocations
            .get(&allocation)
            .ok_or(RelayError::UnknownAllocation(allocation))?;
        if let Some(code) = &entry.join_code {
            return Ok(code.clone());
        }

        let code = loop {
            let candidate: String = rand::rng()
                .sample_iter(rand::distr::Alphanumeric)
                .take(JOIN_CODE_LEN)
                .map(|byte| (byte as char).to_ascii_uppercase())
                .collect();
            if !self.join_codes.contains_key(&candidate) {
                break candidate;
            }
        };
        self.join_codes.insert(code.clone(), allocation);
        if let Some(entry) = self.allocations.get_mut(&allocation) {
            entry.join_code = Some(code.clone());
        }
        Ok(code)
    }

    pub(crate) fn has_allocation(&self, allocation: AllocationId) -> bool {
        self.allocations.contains_key(&allocation)
    }
}

// ============================================================================
// Driver side
// ============================================================================

impl HubState {
    pub(crate) fn bind_attempt(&mut self) -> Result<(), DriverError> {
        self.bind_calls += 1;
        if self.fail_bind {
            return Err(DriverError::Bind("injected failure".into()));
        }
        Ok(())
    }

    pub(crate) fn listen_attempt(&mut self) -> Result<(), DriverError> {
        self.listen_calls += 1;
        if self.fail_listen {
            return Err(DriverError::Listen("injected failure".into()));
        }
        Ok(())
    }

    /// Player side: open a link toward an allocation's host and queue it for
    /// accept.
    pub(crate) fn open_link(
        &mut self,
        allocation: AllocationId,
    ) -> Result<ConnectionHandle, DriverError> {
        if self.fail_connect {
            return Err(DriverError::Connect("injected failure".into()));
        }
        let entry = self
            .allocations
            .get_mut(&allocation)
            .ok_or_else(|| DriverError::Connect(format!("unknown allocation {allocation}")))?;
        self.next_handle += 1;
        let handle = ConnectionHandle::new(self.next_handle);
        entry.pending.push_back(handle);
        self.links.insert(handle, Link::default());
        Ok(handle)
    }

    /// Host side: take the oldest still-open pending link, mark it accepted,
    /// and tell the player it is connected.
    pub(crate) fn accept_link(&mut self, allocation: AllocationId) -> Option<ConnectionHandle> {
        let entry = self.allocations.get_mut(&allocation)?;
        while let Some(handle) = entry.pending.pop_front() {
            let Some(link) = self.links.get_mut(&handle) else {
                continue;
            };
            if link.closed {
                continue;
            }
            link.accepted = true;
            link.mailbox_mut(Side::Player).push_back(DriverEvent::Connected);
            return Some(handle);
        }
        None
    }

    pub(crate) fn send_on(
        &mut self,
        handle: ConnectionHandle,
        from: Side,
        payload: &[u8],
    ) -> Result<(), DriverError> {
        if self.refuse_sends {
            return Err(DriverError::Send("injected refusal".into()));
        }
        let link = self
            .links
            .get_mut(&handle)
            .ok_or(DriverError::InvalidConnection(handle))?;
        if link.closed {
            return Err(DriverError::Send("connection is closed".into()));
        }
        if !link.accepted {
            return Err(DriverError::Send("connection is not established".into()));
        }
        link.mailbox_mut(from.other())
            .push_back(DriverEvent::Data(Bytes::copy_from_slice(payload)));
        Ok(())
    }

    /// Close a link and tell the other end. Idempotent.
    pub(crate) fn close_link(
        &mut self,
        handle: ConnectionHandle,
        from: Side,
    ) -> Result<(), DriverError> {
        let link = self
            .links
            .get_mut(&handle)
            .ok_or(DriverError::InvalidConnection(handle))?;
        if !link.closed {
            link.closed = true;
            link.mailbox_mut(from.other())
                .push_back(DriverEvent::Disconnected(DisconnectReason::Disconnected));
        }
        Ok(())
    }

    /// Move everything waiting for `side` on this link out of the hub.
    pub(crate) fn drain_mailbox(
        &mut self,
        handle: ConnectionHandle,
        side: Side,
    ) -> Vec<DriverEvent> {
        match self.links.get_mut(&handle) {
            Some(link) => link.mailbox_mut(side).drain(..).collect(),
            None => Vec::new(),
        }
    }
}
