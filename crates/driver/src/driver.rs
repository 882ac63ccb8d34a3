use hawser_relay::RelayEndpoint;

use crate::{ConnectionHandle, DriverError, DriverEvent};

/// Boundary to the relay-capable UDP driver.
///
/// A driver is created for one relay endpoint and then driven synchronously
/// from the host's tick: [`pump`](Self::pump) once, then drain
/// [`pop_event`](Self::pop_event) per connection until it returns `None`.
/// Reliability, congestion control, and the relay handshake are the driver's
/// business; callers only see handles and events.
pub trait RelayDriver: Send + 'static {
    /// Bind a wildcard local endpoint.
    fn bind(&mut self) -> Result<(), DriverError>;

    /// Start accepting inbound connections. Requires a successful
    /// [`bind`](Self::bind).
    fn listen(&mut self) -> Result<(), DriverError>;

    /// Start the outbound connection attempt toward the relay host. The
    /// remote is fixed by the endpoint the driver was created for.
    ///
    /// Returns the handle of the new, not yet established connection; the
    /// outcome arrives later as a [`DriverEvent::Connected`] or nothing at
    /// all.
    fn connect(&mut self) -> Result<ConnectionHandle, DriverError>;

    /// Take one pending inbound connection, if any. Accepted connections are
    /// established from the driver's point of view.
    fn accept(&mut self) -> Option<ConnectionHandle>;

    /// Close one connection at the driver level.
    fn disconnect(&mut self, connection: ConnectionHandle) -> Result<(), DriverError>;

    /// Queue one datagram on a connection. Exactly `payload.len()` bytes are
    /// sent.
    fn send(&mut self, connection: ConnectionHandle, payload: &[u8]) -> Result<(), DriverError>;

    /// Schedule the driver's internal update and wait for it to complete.
    /// Must run once per tick before events are read.
    fn pump(&mut self);

    /// Pop the next pending event for one connection, `None` when its queue
    /// is empty this tick.
    fn pop_event(&mut self, connection: ConnectionHandle) -> Option<DriverEvent>;

    fn is_bound(&self) -> bool;
}

/// Creates drivers bound to relay endpoints.
///
/// Split from [`RelayDriver`] so the same factory can hand out host and
/// player drivers wired to whatever backs the endpoint.
pub trait DriverFactory: Send + Sync {
    type Driver: RelayDriver;

    fn create_driver(&self, endpoint: &RelayEndpoint) -> Result<Self::Driver, DriverError>;
}
