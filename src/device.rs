//! Open sessions to addressed instruments.
//!
//! A [`Device`] owns one native descriptor. Its state is `Open(descriptor)`
//! until a successful [`Device::close`], after which it is `Closed` and the
//! descriptor is gone; there is no way back. One mutex guards the state and
//! every native call together with its decode, so a `close` racing a
//! `read`/`write` on another thread can never hand a released descriptor to
//! the driver.
//!
//! All calls block the calling thread until the driver returns. The
//! lifecycle signal does not interrupt them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::driver::{default_driver, BusDriver, Descriptor};
use crate::error::{GpibError, GpibResult};
use crate::lifecycle::{Lifecycle, Options};

/// Board, primary address and secondary address of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Interface board index.
    pub board: i32,
    /// Primary address (0-30).
    pub pad: i32,
    /// Secondary address (0 for none, or 96-126).
    pub sad: i32,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIB{}::{}::{}", self.board, self.pad, self.sad)
    }
}

#[derive(Debug)]
enum State {
    Open(Descriptor),
    Closed,
}

/// An open session to one instrument on the bus.
///
/// `Device` is `Send + Sync`; concurrent calls on one device are serialized.
/// Opening two devices on the same address is not supported.
pub struct Device {
    driver: Arc<dyn BusDriver>,
    address: Address,
    lifecycle: Lifecycle,
    state: Mutex<State>,
}

impl Device {
    /// Open the device at `board`/`pad`/`sad` with the default driver.
    ///
    /// # Errors
    ///
    /// `DriverNotEnabled` when built without `linux-gpib`; `Open` when the
    /// driver refuses the address.
    pub fn open(board: i32, pad: i32, sad: i32, options: Options) -> GpibResult<Self> {
        Self::open_with(default_driver()?, board, pad, sad, options)
    }

    /// Open the device at `board`/`pad`/`sad` on `driver`.
    pub fn open_with(
        driver: Arc<dyn BusDriver>,
        board: i32,
        pad: i32,
        sad: i32,
        options: Options,
    ) -> GpibResult<Self> {
        let lifecycle = options.lifecycle();
        let address = Address { board, pad, sad };

        let Some(descriptor) = driver.open(board, pad, sad) else {
            lifecycle.cancel();
            return Err(GpibError::Open { board, pad, sad });
        };

        debug!(
            driver = driver.name(),
            %address,
            %descriptor,
            "opened gpib device"
        );

        Ok(Self {
            driver,
            address,
            lifecycle,
            state: Mutex::new(State::Open(descriptor)),
        })
    }

    /// Release the native descriptor and signal teardown.
    ///
    /// Closing a closed device succeeds without touching the driver. The
    /// lifecycle is cancelled before the release; if the release fails the
    /// error is returned and the device stays open, so `close` can be
    /// retried.
    pub fn close(&self) -> GpibResult<()> {
        let mut state = self.state.lock();
        let State::Open(descriptor) = *state else {
            return Ok(());
        };

        self.lifecycle.cancel();
        self.driver.release(descriptor).into_result()?;

        *state = State::Closed;
        debug!(address = %self.address, %descriptor, "closed gpib device");
        Ok(())
    }

    /// Return the instrument to local front-panel control.
    pub fn local(&self) -> GpibResult<()> {
        let state = self.state.lock();
        let descriptor = Self::descriptor(&state)?;
        self.driver.go_to_local(descriptor).into_result()?;
        debug!(address = %self.address, "returned to local control");
        Ok(())
    }

    /// Write all of `buf` to the addressed listener.
    ///
    /// Returns `buf.len()` on success; a partial transfer is an error.
    pub fn write(&self, buf: &[u8]) -> GpibResult<usize> {
        let state = self.state.lock();
        let descriptor = Self::descriptor(&state)?;
        self.driver.write(descriptor, buf).into_result()?;
        trace!(address = %self.address, bytes = buf.len(), "wrote");
        Ok(buf.len())
    }

    /// Read one response into `buf`.
    ///
    /// Returns `min(buf.len(), bytes received)`. Bytes the driver reports
    /// beyond `buf.len()` are dropped, not kept for the next call, so size
    /// `buf` for the largest expected reply.
    pub fn read(&self, buf: &mut [u8]) -> GpibResult<usize> {
        let state = self.state.lock();
        let descriptor = Self::descriptor(&state)?;
        let reported = self.driver.read(descriptor, buf).into_result()?;
        let n = reported.min(buf.len());
        if reported > n {
            trace!(
                address = %self.address,
                reported,
                kept = n,
                "read truncated to caller buffer"
            );
        } else {
            trace!(address = %self.address, bytes = n, "read");
        }
        Ok(n)
    }

    /// The address this device was opened with.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Teardown signal, cancelled when the device is closed.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Whether `close` has completed successfully.
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), State::Closed)
    }

    fn descriptor(state: &State) -> GpibResult<Descriptor> {
        match state {
            State::Open(descriptor) => Ok(*descriptor),
            State::Closed => Err(GpibError::DeviceClosed),
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("driver", &self.driver.name())
            .field("address", &self.address)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(address = %self.address, error = %e, "failed to release gpib device on drop");
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::driver::{Operation, SimulatedBoard};
    use crate::error::ErrorKind;
    use tracing_test::traced_test;

    fn board_with_meter() -> Arc<SimulatedBoard> {
        let board = Arc::new(SimulatedBoard::new());
        board.attach(0, 13, 0);
        board
    }

    #[test]
    fn test_open_write_close_scenario() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();
        assert!(!dev.is_closed());

        assert_eq!(dev.write(b"*RST\r\n").unwrap(), 6);

        dev.close().unwrap();
        dev.close().unwrap();
        assert!(dev.is_closed());
        assert_eq!(board.release_calls(), 1);
    }

    #[test]
    fn test_open_failure_is_open_error() {
        let board = board_with_meter();
        let parent = Lifecycle::new();
        let err = Device::open_with(board, 2, 13, 0, Options::default().with_base(parent.clone()))
            .unwrap_err();
        assert!(matches!(err, GpibError::Open { board: 2, pad: 13, sad: 0 }));
        assert!(err.kind().is_none());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_failed_close_can_be_retried() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();

        board.fail_next(Operation::Release, 12, 5);
        let err = dev.close().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::SystemCall));
        assert_eq!(err.raw_os_error(), Some(5));
        assert!(!dev.is_closed());
        // teardown was still signalled
        assert!(dev.lifecycle().is_cancelled());

        dev.close().unwrap();
        assert!(dev.is_closed());
        assert_eq!(board.release_calls(), 2);
    }

    #[test]
    fn test_io_after_close_never_reaches_driver() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();
        dev.close().unwrap();

        assert!(matches!(dev.write(b"ZE\r\n"), Err(GpibError::DeviceClosed)));
        let mut buf = [0u8; 8];
        assert!(matches!(dev.read(&mut buf), Err(GpibError::DeviceClosed)));
        assert!(matches!(dev.local(), Err(GpibError::DeviceClosed)));
        assert!(board.writes(0, 13, 0).is_empty());
        assert_eq!(board.local_calls(0, 13, 0), 0);
    }

    #[test]
    fn test_local_passes_through_decoder() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();
        dev.local().unwrap();
        assert_eq!(board.local_calls(0, 13, 0), 1);
        assert!(!dev.is_closed());

        board.fail_next(Operation::Local, 1, 0);
        assert_eq!(dev.local().unwrap_err().kind(), Some(ErrorKind::NotControllerInCharge));
    }

    #[test]
    fn test_drop_releases_descriptor() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();
        let lifecycle = dev.lifecycle().clone();
        assert_eq!(board.open_descriptors(), 1);
        drop(dev);
        assert_eq!(board.open_descriptors(), 0);
        assert!(lifecycle.is_cancelled());
    }

    #[test]
    #[traced_test]
    fn test_drop_logs_failed_release() {
        let board = board_with_meter();
        let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default()).unwrap();
        board.fail_next(Operation::Release, 7, 0);
        drop(dev);
        assert!(logs_contain("failed to release gpib device on drop"));
    }

    #[test]
    fn test_device_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
