//! Relay allocation service boundary.
//!
//! A relay session starts with the host reserving capacity (an allocation)
//! and sharing the short join code the service issues for it; players hand
//! the code back to the service and receive the endpoint that routes to the
//! host. This crate defines those data types and the [`RelayProvider`] trait
//! the adapter calls; the actual service protocol lives behind the trait.

mod error;
mod provider;
mod types;

pub use error::RelayError;
pub use provider::RelayProvider;
pub use types::{AllocationId, HostAllocation, JoinCode, JoinGrant, RelayEndpoint};
