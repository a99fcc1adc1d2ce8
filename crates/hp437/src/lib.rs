//! HP 437B Power Meter driver
//!
//! Drives an HP 437B over GPIB/HP-IB using only the `gpib` crate's
//! `write`/`read`/`local`/`close` calls. Commands are plain ASCII terminated
//! with CR LF; readings come back as ASCII floats in the configured units.
//!
//! ```no_run
//! use gpib::{Device, Options};
//! use hp437::{Hp437, Units};
//!
//! let meter = Hp437::new(Device::open(0, 13, 0, Options::default())?);
//! meter.reset()?;
//! meter.unit(Units::Dbm)?;
//! println!("{} {}", meter.power()?, Units::Dbm);
//! # Ok::<(), hp437::Hp437Error>(())
//! ```

use std::fmt;
use std::num::ParseFloatError;

use gpib::{Device, GpibError};
use thiserror::Error;
use tracing::debug;

const TERMINATOR: &str = "\r\n";

/// Size of the buffer used for power readings.
const READ_BUFFER_SIZE: usize = 1024;

/// Errors from the power meter driver.
#[derive(Debug, Error)]
pub enum Hp437Error {
    #[error(transparent)]
    Bus(#[from] GpibError),

    #[error("Failed to parse power reading '{reading}': {source}")]
    Parse {
        reading: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Power units the meter can report in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    /// Linear, in Watts (`LN`)
    Watts,
    /// Logarithmic, in dBm (`LG`)
    Dbm,
}

impl Units {
    /// Command mnemonic selecting these units.
    pub fn command(self) -> &'static str {
        match self {
            Units::Watts => "LN",
            Units::Dbm => "LG",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Units::Watts => f.write_str("Watts"),
            Units::Dbm => f.write_str("dBm"),
        }
    }
}

/// An HP 437B on the bus.
#[derive(Debug)]
pub struct Hp437 {
    device: Device,
}

impl Hp437 {
    /// Wrap an open device.
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    fn send(&self, command: &str) -> Result<(), Hp437Error> {
        debug!(address = %self.device.address(), command, "hp437 command");
        self.device
            .write(format!("{command}{TERMINATOR}").as_bytes())?;
        Ok(())
    }

    /// Soft-reset the meter.
    pub fn reset(&self) -> Result<(), Hp437Error> {
        self.send("*RST")
    }

    /// Zero the sensor against the reference power.
    pub fn zero(&self) -> Result<(), Hp437Error> {
        self.send("ZE")
    }

    /// Show `text` on the front-panel display.
    ///
    /// The display only fits a few characters; longer text is cut off by
    /// the meter.
    pub fn display_user(&self, text: &str) -> Result<(), Hp437Error> {
        self.send(&format!("DU{text}"))
    }

    /// Offset readings by `offset` dB to account for couplers or attenuators.
    pub fn offset(&self, offset: f64) -> Result<(), Hp437Error> {
        self.send(&format!("OS{offset:.6}EN"))
    }

    /// Select the units readings are reported in.
    pub fn unit(&self, units: Units) -> Result<(), Hp437Error> {
        self.send(units.command())
    }

    /// Read one power measurement in the configured units.
    pub fn power(&self) -> Result<f64, Hp437Error> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = self.device.read(&mut buf)?;
        parse_power_response(&String::from_utf8_lossy(&buf[..n]))
    }

    /// Hand the meter back to its front panel.
    pub fn local(&self) -> Result<(), Hp437Error> {
        self.device.local()?;
        Ok(())
    }

    /// Release the underlying device.
    pub fn close(&self) -> Result<(), Hp437Error> {
        self.device.close()?;
        Ok(())
    }

    /// The underlying bus device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Unwrap into the underlying bus device.
    pub fn into_inner(self) -> Device {
        self.device
    }
}

/// Parse a reading such as `-12.34E+00\r\n`.
fn parse_power_response(response: &str) -> Result<f64, Hp437Error> {
    let reading = response.trim();
    reading.parse::<f64>().map_err(|source| Hp437Error::Parse {
        reading: reading.to_string(),
        source,
    })
}
