use thiserror::Error;

use crate::AllocationId;

/// Failures from the relay allocation service.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Creating a host allocation failed.
    #[error("allocation failed: {0}")]
    Allocation(String),
    /// Joining an allocation through a join code failed.
    #[error("join failed: {0}")]
    Join(String),
    /// Fetching the join code for an allocation failed.
    #[error("join code fetch failed: {0}")]
    JoinCode(String),
    /// The join code does not map to a live allocation.
    #[error("unknown join code")]
    UnknownJoinCode,
    /// The allocation id is not known to the service.
    #[error("unknown allocation {0}")]
    UnknownAllocation(AllocationId),
}
