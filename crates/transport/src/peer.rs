use std::sync::Arc;

use hawser_driver::{ConnectionHandle, RelayDriver};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Outbound byte path a [`Connection`](crate::Connection) uses to reach its
/// owning peer's driver.
///
/// Failure policy for the whole send path: an unusable target warns and
/// drops the payload, a refused driver write is logged at debug and dropped.
/// Nothing propagates to the caller.
pub(crate) trait SendPort: Send + Sync {
    fn send_to(&self, handle: ConnectionHandle, payload: &[u8]);
}

/// Shared ownership of the transport driver.
///
/// `None` before setup and after the server releases the driver on shutdown.
/// Poll paths lock it for one pump-and-drain pass; sends from host code lock
/// it per datagram.
pub(crate) struct DriverCell<D> {
    inner: Arc<Mutex<Option<D>>>,
}

impl<D> Clone for DriverCell<D> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<D: RelayDriver> DriverCell<D> {
    pub(crate) fn empty() -> Self {
        Self { inner: Arc::new(Mutex::new(None)) }
    }

    pub(crate) fn install(&self, driver: D) {
        *self.inner.lock() = Some(driver);
    }

    /// Drop the driver, releasing whatever it holds.
    pub(crate) fn release(&self) {
        *self.inner.lock() = None;
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Run `f` against the installed driver, `None` when there is none.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut D) -> R) -> Option<R> {
        self.inner.lock().as_mut().map(f)
    }
}

impl<D: RelayDriver> SendPort for DriverCell<D> {
    fn send_to(&self, handle: ConnectionHandle, payload: &[u8]) {
        let mut guard = self.inner.lock();
        let Some(driver) = guard.as_mut() else {
            warn!(%handle, "send skipped, driver is released");
            return;
        };
        if let Err(error) = driver.send(handle, payload) {
            debug!(%handle, %error, "driver refused send");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawser_driver::{DriverError, DriverEvent};

    /// Driver stub that records sends and can be told to refuse them.
    #[derive(Default)]
    struct StubDriver {
        refuse_sends: bool,
        sent: Vec<(ConnectionHandle, Vec<u8>)>,
    }

    impl RelayDriver for StubDriver {
        fn bind(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        fn listen(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        fn connect(&mut self) -> Result<ConnectionHandle, DriverError> {
            Ok(ConnectionHandle::new(1))
        }

        fn accept(&mut self) -> Option<ConnectionHandle> {
            None
        }

        fn disconnect(&mut self, _connection: ConnectionHandle) -> Result<(), DriverError> {
            Ok(())
        }

        fn send(
            &mut self,
            connection: ConnectionHandle,
            payload: &[u8],
        ) -> Result<(), DriverError> {
            if self.refuse_sends {
                return Err(DriverError::Send("refused".into()));
            }
            self.sent.push((connection, payload.to_vec()));
            Ok(())
        }

        fn pump(&mut self) {}

        fn pop_event(&mut self, _connection: ConnectionHandle) -> Option<DriverEvent> {
            None
        }

        fn is_bound(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_send_reaches_installed_driver() {
        let cell = DriverCell::empty();
        cell.install(StubDriver::default());

        cell.send_to(ConnectionHandle::new(7), b"data");
        let sent = cell.with(|driver| driver.sent.clone());
        assert_eq!(sent, Some(vec![(ConnectionHandle::new(7), b"data".to_vec())]));
    }

    #[test]
    fn test_send_without_driver_is_dropped() {
        let cell: DriverCell<StubDriver> = DriverCell::empty();
        cell.send_to(ConnectionHandle::new(7), b"data");
        assert!(!cell.is_installed());
    }

    #[test]
    fn test_refused_send_is_swallowed() {
        let cell = DriverCell::empty();
        cell.install(StubDriver { refuse_sends: true, ..Default::default() });

        cell.send_to(ConnectionHandle::new(7), b"data");
        let sent = cell.with(|driver| driver.sent.clone());
        assert_eq!(sent, Some(Vec::new()));
    }

    #[test]
    fn test_release_drops_the_driver() {
        let cell = DriverCell::empty();
        cell.install(StubDriver::default());
        assert!(cell.is_installed());

        cell.release();
        assert!(!cell.is_installed());
        assert_eq!(cell.with(|driver| driver.sent.len()), None);
    }
}
