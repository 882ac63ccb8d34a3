use bytes::Bytes;
use hawser_driver::DisconnectReason;

use crate::connection::Connection;

/// Events a client surfaces to the caller, in order, once per poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The outbound connection completed its handshake.
    Connected {
        /// The now-established connection.
        connection: Connection,
    },
    /// The connect attempt did not establish within the timeout window.
    /// Raised at most once per attempt.
    ConnectionFailed,
    /// The connection is gone.
    Disconnected {
        /// The invalidated wrapper; retained clones still compare equal.
        connection: Connection,
        /// Driver-reported reason.
        reason: DisconnectReason,
    },
    /// A datagram arrived.
    Data {
        connection: Connection,
        /// Owned payload, sized exactly to the datagram.
        payload: Bytes,
    },
}

/// Events a server surfaces to the caller, in order, once per poll.
///
/// Per connection the order matches the driver's queue; across connections
/// dispatch runs in ascending handle order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// An inbound connection was accepted and registered.
    Connected {
        connection: Connection,
    },
    /// A registered connection is gone; its registry entry is invalidated in
    /// place and removed on the next tick. Host-initiated teardown via
    /// [`shutdown`](crate::Server::shutdown) does not produce these.
    Disconnected {
        connection: Connection,
        reason: DisconnectReason,
    },
    /// A datagram arrived.
    Data {
        connection: Connection,
        payload: Bytes,
    },
}
