use std::fmt;

/// Opaque identifier for a relay-side resource reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(u64);

impl AllocationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Short human-shareable token the relay service maps back to an allocation.
///
/// Construction performs no validation; a client rejects empty codes before
/// the service is ever contacted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinCode(String);

impl JoinCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a driver needs to reach the relay for one allocation.
///
/// Produced by the relay service, consumed by the driver factory; the
/// adapter itself never inspects it beyond logging the allocation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    /// Allocation this endpoint routes to.
    pub allocation: AllocationId,
    /// Relay server host.
    pub host: String,
    /// Relay server UDP port.
    pub port: u16,
}

/// Host-side reservation returned by [`allocate`](crate::RelayProvider::allocate).
///
/// Owned by the server for its whole lifetime; the endpoint is what the host
/// driver binds through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllocation {
    pub id: AllocationId,
    pub endpoint: RelayEndpoint,
    /// Capacity the reservation was made for.
    pub max_connections: u32,
}

/// Player-side grant returned by [`join`](crate::RelayProvider::join).
///
/// Held only for the duration of the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGrant {
    pub endpoint: RelayEndpoint,
}
