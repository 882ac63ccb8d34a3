use hawser_driver::DriverError;
use hawser_relay::RelayError;
use thiserror::Error;

/// Client-side setup and connect failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The join code was empty. Checked before any relay call.
    #[error("join code is empty")]
    EmptyJoinCode,
    /// The relay service rejected the join.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
    /// Driver creation, bind, or connect failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    /// `connect` needs a successful `prepare_connect` first.
    #[error("client is not prepared")]
    NotPrepared,
    /// There is already an active connection or attempt.
    #[error("client already has an active connection")]
    AlreadyConnected,
}

/// Server-side setup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The relay service rejected the allocation request.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
    /// Driver creation, bind, or listen failed.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
    /// `start` needs a successful `prepare_start` first.
    #[error("server is not prepared")]
    NotPrepared,
    /// The host driver is already up.
    #[error("server is already started")]
    AlreadyStarted,
}
