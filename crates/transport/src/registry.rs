use std::collections::HashMap;

use hawser_driver::ConnectionHandle;

use crate::connection::Connection;

/// Registry of live inbound connections, keyed by driver handle.
///
/// Entries go in on accept and come out in [`prune_stale`](Self::prune_stale)
/// on the tick after their slot closes, never mid-dispatch. Pruning before
/// accepting lets the driver reuse a handle within a single tick without
/// colliding with a dead entry.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionHandle, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection keyed by its handle, replacing any stale entry
    /// still sitting under the same handle.
    pub fn insert(&mut self, connection: Connection) {
        self.entries.insert(connection.id(), connection);
    }

    pub fn get(&self, handle: ConnectionHandle) -> Option<&Connection> {
        self.entries.get(&handle)
    }

    pub fn contains(&self, handle: ConnectionHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered handles in ascending order, for deterministic dispatch.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        let mut handles: Vec<_> = self.entries.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.entries.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove every entry whose slot has closed and return their handles.
    ///
    /// A second pass with no closures in between removes nothing, so callers
    /// may run it every tick unconditionally.
    pub fn prune_stale(&mut self) -> Vec<ConnectionHandle> {
        let stale: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, connection)| connection.is_closed())
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &stale {
            self.entries.remove(handle);
        }
        stale
    }
}
