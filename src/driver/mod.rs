//! Bus controller drivers.
//!
//! A [`BusDriver`] exposes the handful of native calls the core needs. Each
//! call returns the raw [`Outcome`] (status word, `iberr`, byte count)
//! read back on the calling thread; decoding is left to the caller so the
//! error table lives in one place.

use std::fmt;
use std::sync::Arc;

use crate::error::GpibResult;
use crate::status::Outcome;

#[cfg(feature = "linux-gpib")]
pub mod linux_gpib;
#[cfg(feature = "mock")]
pub mod simulated;

#[cfg(feature = "linux-gpib")]
pub use linux_gpib::LinuxGpib;
#[cfg(feature = "mock")]
pub use simulated::{Operation, SimulatedBoard};

/// Opaque native handle for one addressed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor(i32);

impl Descriptor {
    /// Wrap a raw descriptor returned by the driver.
    pub fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw descriptor value.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ud{}", self.0)
    }
}

/// Native calls made against a bus controller.
///
/// Implementations must be safe to share between threads; the core
/// serializes calls per device but not across devices.
pub trait BusDriver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Acquire a descriptor (`ibdev`). `None` means the driver returned its
    /// invalid-descriptor sentinel.
    fn open(&self, board: i32, pad: i32, sad: i32) -> Option<Descriptor>;

    /// Release the descriptor (`ibonl(ud, 0)`).
    fn release(&self, ud: Descriptor) -> Outcome;

    /// Return the device to local control (`ibloc`).
    fn go_to_local(&self, ud: Descriptor) -> Outcome;

    /// Write all of `data` (`ibwrt`).
    fn write(&self, ud: Descriptor, data: &[u8]) -> Outcome;

    /// Read into `buf` (`ibrd`). The reported count may exceed `buf.len()`.
    fn read(&self, ud: Descriptor, buf: &mut [u8]) -> Outcome;
}

/// The driver used by [`Device::open`](crate::Device::open).
#[cfg(feature = "linux-gpib")]
pub fn default_driver() -> GpibResult<Arc<dyn BusDriver>> {
    Ok(Arc::new(LinuxGpib))
}

/// The driver used by [`Device::open`](crate::Device::open).
#[cfg(not(feature = "linux-gpib"))]
pub fn default_driver() -> GpibResult<Arc<dyn BusDriver>> {
    Err(crate::error::GpibError::DriverNotEnabled)
}
