//! Relay transport adapter.
//!
//! Binds a game host's networking surface to a relay service and its UDP
//! driver. The adapter owns three things and nothing else:
//!
//! - a registry of live connections on the host side,
//! - a once-per-tick [`poll`](Server::poll) that drains driver events into
//!   typed host events,
//! - best-effort timeout detection for outbound connection attempts.
//!
//! Connection establishment, reliability, and the relay protocol itself live
//! behind the [`RelayDriver`](hawser_driver::RelayDriver) and
//! [`RelayProvider`](hawser_relay::RelayProvider) boundaries.
//!
//! # Ticking
//!
//! Both [`Client`] and [`Server`] are driven from the host's update loop:
//! call `poll()` once per tick and handle the returned events in order. The
//! only async entry points are the `prepare_*` calls, which await the relay
//! service, and the client's connect watchdog, which runs as a background
//! task and surfaces through `poll()` like everything else.

mod client;
mod connection;
mod error;
mod events;
mod peer;
mod registry;
mod server;

pub use client::{Client, ClientConfig, DEFAULT_CONNECT_TIMEOUT};
pub use connection::Connection;
pub use error::{ClientError, ServerError};
pub use events::{ClientEvent, ServerEvent};
pub use registry::ConnectionRegistry;
pub use server::Server;

// The handle and reason types appear in this crate's public API; re-export
// them so hosts do not need a direct dependency on the driver crate.
pub use hawser_driver::{ConnectionHandle, DisconnectReason};
