use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use hawser_driver::ConnectionHandle;
use parking_lot::RwLock;
use tracing::warn;

use crate::peer::SendPort;

/// Live state of a connection wrapper.
///
/// A wrapper starts `Active` with the handle the driver assigned and moves
/// to `Closed` exactly once, when the driver reports the connection gone or
/// the local side tears it down. It never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Active(ConnectionHandle),
    Closed,
}

struct ConnectionInner {
    /// Identity, fixed at creation. Survives closure so equality and
    /// registry lookups keep working on retained wrappers.
    id: ConnectionHandle,
    slot: RwLock<Slot>,
    /// Whether the driver-level handshake completed. Accepted inbound
    /// connections are born established; outbound ones become established
    /// when the driver reports `Connected`.
    established: AtomicBool,
    port: Arc<dyn SendPort>,
}

/// Cheap-clone wrapper around one logical link.
///
/// Clones share state: closing any of them closes all of them. Equality and
/// hashing go by the underlying handle only, so two wrappers around the same
/// handle compare equal no matter where they were created.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    fn new(id: ConnectionHandle, port: Arc<dyn SendPort>, established: bool) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                slot: RwLock::new(Slot::Active(id)),
                established: AtomicBool::new(established),
                port,
            }),
        }
    }

    /// Wrapper for an outbound attempt: live handle, not yet established.
    pub(crate) fn outbound(id: ConnectionHandle, port: Arc<dyn SendPort>) -> Self {
        Self::new(id, port, false)
    }

    /// Wrapper for an accepted inbound connection, established at birth.
    pub(crate) fn accepted(id: ConnectionHandle, port: Arc<dyn SendPort>) -> Self {
        Self::new(id, port, true)
    }

    /// The handle this connection was created with. Stable across closure.
    pub fn id(&self) -> ConnectionHandle {
        self.inner.id
    }

    /// Handle for driver calls, `None` once the slot is closed.
    pub(crate) fn handle(&self) -> Option<ConnectionHandle> {
        match *self.inner.slot.read() {
            Slot::Active(handle) => Some(handle),
            Slot::Closed => None,
        }
    }

    /// Whether the slot has been invalidated, by either side.
    pub fn is_closed(&self) -> bool {
        self.handle().is_none()
    }

    /// Whether the link is established and still live.
    pub fn is_connected(&self) -> bool {
        self.inner.established.load(Ordering::Acquire) && !self.is_closed()
    }

    pub(crate) fn mark_established(&self) {
        self.inner.established.store(true, Ordering::Release);
    }

    /// Invalidate the wrapper in place. Registry removal happens separately,
    /// on the next pruning pass.
    pub(crate) fn close(&self) {
        *self.inner.slot.write() = Slot::Closed;
        self.inner.established.store(false, Ordering::Release);
    }

    /// Send one datagram to the remote side of this connection.
    ///
    /// Failures never reach the caller: a closed connection logs a warning
    /// and drops the payload, a driver refusal is logged at debug and
    /// dropped. A send racing a disconnect mid-tick is expected, not a
    /// fault.
    pub fn send(&self, payload: &[u8]) {
        let Some(handle) = self.handle() else {
            warn!(id = %self.inner.id, "send skipped, connection is not active");
            return;
        };
        self.inner.port.send_to(handle, payload);
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Connection {}

impl Hash for Connection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("slot", &*self.inner.slot.read())
            .finish()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection-{}", self.inner.id)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Send port that records every payload it is asked to forward.
    #[derive(Default)]
    pub(crate) struct RecordingPort {
        pub(crate) sent: Mutex<Vec<(ConnectionHandle, Vec<u8>)>>,
    }

    impl SendPort for RecordingPort {
        fn send_to(&self, handle: ConnectionHandle, payload: &[u8]) {
            self.sent.lock().push((handle, payload.to_vec()));
        }
    }

    /// Accepted connection over a throwaway recording port.
    pub(crate) fn test_connection(id: u64) -> Connection {
        Connection::accepted(ConnectionHandle::new(id), Arc::new(RecordingPort::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::{test_support::*, *};

    #[test]
    fn test_equality_is_by_handle() {
        let port: Arc<dyn SendPort> = Arc::new(RecordingPort::default());
        let a = Connection::accepted(ConnectionHandle::new(3), Arc::clone(&port));
        let b = Connection::accepted(ConnectionHandle::new(3), Arc::clone(&port));
        let c = Connection::accepted(ConnectionHandle::new(4), port);

        assert_eq!(a, b);
        assert_ne!(a, c);
        // A clone and an independently built wrapper hash alike.
        let mut set = std::collections::HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_identity_survives_closure() {
        let conn = test_connection(9);
        let retained = conn.clone();
        conn.close();

        assert!(retained.is_closed());
        assert_eq!(retained.id(), ConnectionHandle::new(9));
        assert_eq!(conn, retained);
    }

    #[test]
    fn test_outbound_is_not_connected_until_established() {
        let port = Arc::new(RecordingPort::default());
        let conn = Connection::outbound(ConnectionHandle::new(1), port);

        assert!(!conn.is_connected());
        conn.mark_established();
        assert!(conn.is_connected());
        conn.close();
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_send_goes_through_port_while_active() {
        let port = Arc::new(RecordingPort::default());
        let conn = Connection::accepted(ConnectionHandle::new(2), port.clone());

        conn.send(b"ping");
        let sent = port.sent.lock();
        assert_eq!(*sent, vec![(ConnectionHandle::new(2), b"ping".to_vec())]);
    }

    #[test]
    fn test_send_on_closed_connection_is_a_noop() {
        let port = Arc::new(RecordingPort::default());
        let conn = Connection::accepted(ConnectionHandle::new(2), port.clone());

        conn.close();
        conn.send(b"ping");
        assert!(port.sent.lock().is_empty());
    }
}
