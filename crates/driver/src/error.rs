use thiserror::Error;

use crate::ConnectionHandle;

/// Failures from the transport driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver could not be created for the given relay endpoint.
    #[error("driver creation failed: {0}")]
    Create(String),
    /// Binding the local endpoint failed.
    #[error("bind failed: {0}")]
    Bind(String),
    /// The bound driver refused to start listening.
    #[error("listen failed: {0}")]
    Listen(String),
    /// Starting the outbound connection attempt failed.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The operation requires a bound driver.
    #[error("driver is not bound")]
    NotBound,
    /// The handle does not name a connection this driver knows.
    #[error("unknown connection {0}")]
    InvalidConnection(ConnectionHandle),
    /// The driver refused to take the payload.
    #[error("send refused: {0}")]
    Send(String),
}
