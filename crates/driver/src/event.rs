use std::fmt;

use bytes::Bytes;

/// Reason attached to a driver-level disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote side closed the connection or the link was lost.
    Disconnected,
    /// The driver's keep-alive window expired.
    TimedOut,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// One event popped from a driver's per-connection queue.
///
/// `Data` payloads are owned: they stay valid across subsequent driver
/// calls. Drivers must not hand out views into internal buffers they reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// The connection completed its handshake and is usable.
    Connected,
    /// A datagram arrived, sized exactly to what the remote side sent.
    Data(Bytes),
    /// The connection is gone.
    Disconnected(DisconnectReason),
}
