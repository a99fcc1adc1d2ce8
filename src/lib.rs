//! Blocking control of instruments on a GPIB/HP-IB bus.
//!
//! This crate wraps a bus controller driver (linux-gpib by default) behind a
//! small owned-handle API: [`Device::open`] acquires a descriptor for one
//! addressed instrument, [`Device::write`] and [`Device::read`] move raw
//! bytes, [`Device::local`] hands the instrument back to its front panel and
//! [`Device::close`] releases it. Every native status word is decoded into a
//! [`GpibError`] that callers can match on, or classify with
//! [`GpibError::kind`].
//!
//! The core adds no framing: instrument adapters append their own
//! terminators and parse their own replies.
//!
//! # Features
//!
//! - `mock` (default) - [`SimulatedBoard`], an in-memory bus controller
//! - `linux-gpib` - the real driver, linking `libgpib`
//!
//! # Example
//!
//! ```no_run
//! use gpib::{Device, Options};
//!
//! let dev = Device::open(0, 13, 0, Options::default())?;
//! dev.write(b"*IDN?\n")?;
//! let mut buf = [0u8; 256];
//! let n = dev.read(&mut buf)?;
//! println!("{}", String::from_utf8_lossy(&buf[..n]).trim());
//! dev.close()?;
//! # Ok::<(), gpib::GpibError>(())
//! ```

pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod status;

pub use device::{Address, Device};
pub use driver::{BusDriver, Descriptor};
#[cfg(feature = "mock")]
pub use driver::{Operation, SimulatedBoard};
pub use error::{ErrorKind, GpibError, GpibResult};
pub use lifecycle::{Lifecycle, Options};
pub use status::{decode, Outcome, StatusWord};
