//! Transport driver boundary.
//!
//! The adapter never touches sockets itself; it programs against the
//! [`RelayDriver`] trait and receives [`DriverEvent`]s keyed by
//! [`ConnectionHandle`]. Real deployments wrap the vendor UDP driver;
//! tests use the loopback driver from `hawser-test-utils`.

mod driver;
mod error;
mod event;
mod handle;

pub use driver::{DriverFactory, RelayDriver};
pub use error::DriverError;
pub use event::{DisconnectReason, DriverEvent};
pub use handle::ConnectionHandle;
