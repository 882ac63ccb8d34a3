//! In-memory relay and driver for exercising hawser transports in tests.
//!
//! [`MemoryRelay`] plays both sides of the relay contract: it hands out
//! allocations and join codes as a [`hawser_relay::RelayProvider`] and
//! builds [`MemoryDriver`] instances as a [`hawser_driver::DriverFactory`].
//! All drivers created from one relay share a hub, so a host and any
//! number of players wired to the same relay exchange traffic without
//! touching the network. Failure injection hooks cover the error paths
//! the transports have to survive.

mod driver;
mod hub;
mod relay;

pub use driver::MemoryDriver;
pub use relay::MemoryRelay;
