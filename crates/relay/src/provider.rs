use async_trait::async_trait;

use crate::{AllocationId, HostAllocation, JoinCode, JoinGrant, RelayError};

/// Boundary to the external relay allocation service.
///
/// Implementations talk to a real matchmaking backend; tests use the
/// in-memory provider from `hawser-test-utils`. Every call is fallible and
/// callers are expected to log and surface failures rather than retry.
#[async_trait]
pub trait RelayProvider: Send + Sync {
    /// Reserve relay capacity for a host accepting up to `max_connections`
    /// inbound connections.
    async fn allocate(&self, max_connections: u32) -> Result<HostAllocation, RelayError>;

    /// Resolve a join code into a player-side grant for the allocation it
    /// routes to.
    async fn join(&self, code: &JoinCode) -> Result<JoinGrant, RelayError>;

    /// Fetch the shareable join code for a previously created allocation.
    async fn join_code(&self, allocation: AllocationId) -> Result<JoinCode, RelayError>;
}
