//! Error types for the GPIB core.
//!
//! This module defines `GpibError`, the single error type returned by every
//! `Device` operation, and `ErrorKind`, the flat classification callers can
//! switch on.
//!
//! ## Error Hierarchy
//!
//! - **`Open`**: the driver could not hand out a descriptor. Descriptor
//!   acquisition returns a sentinel instead of a status word, so this kind
//!   has no `ErrorKind` counterpart.
//! - **`SystemCall`**: the driver failed inside a system call (`iberr` 0 or
//!   12). The OS error number is kept in the wrapped `std::io::Error`.
//! - **Bus kinds** (`NotControllerInCharge` ... `ServiceRequestStuck`): one
//!   variant per secondary error code, produced by [`crate::status::decode`].
//! - **`Unknown`**: a secondary error code the decoder does not recognise.
//! - **`DeviceClosed`**: I/O attempted on a device after `close`.
//! - **`DriverNotEnabled`**: the default driver was requested but the crate
//!   was built without `linux-gpib`.

use std::fmt;
use std::io;

use thiserror::Error;

/// Convenience alias for results using the GPIB error type.
pub type GpibResult<T> = std::result::Result<T, GpibError>;

/// Classification of a decoded bus error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The driver failed in a system call; see [`GpibError::raw_os_error`].
    SystemCall,
    /// The board must be controller-in-charge.
    NotControllerInCharge,
    /// No listener is addressed.
    NoListeners,
    /// The board failed to address itself before I/O.
    AddressingFailure,
    /// Invalid call arguments.
    InvalidArguments,
    /// The board must be system controller.
    NotSystemController,
    /// A data transfer was aborted.
    IoAborted,
    /// The interface board does not exist.
    BoardNotFound,
    /// An asynchronous operation is still outstanding.
    AsyncPending,
    /// The board lacks the required capability.
    CapabilityMissing,
    /// Writing command bytes timed out.
    Timeout,
    /// Serial poll status bytes were lost.
    StatusBytesLost,
    /// The service request line is stuck asserted.
    ServiceRequestStuck,
    /// Unrecognised secondary error code.
    Unknown,
}

impl ErrorKind {
    /// Map a secondary error code (`iberr`) to its kind.
    ///
    /// Total over `i32`: anything outside the known table is `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 | 12 => ErrorKind::SystemCall,
            1 => ErrorKind::NotControllerInCharge,
            2 => ErrorKind::NoListeners,
            3 => ErrorKind::AddressingFailure,
            4 => ErrorKind::InvalidArguments,
            5 => ErrorKind::NotSystemController,
            6 => ErrorKind::IoAborted,
            7 => ErrorKind::BoardNotFound,
            10 => ErrorKind::AsyncPending,
            11 => ErrorKind::CapabilityMissing,
            14 => ErrorKind::Timeout,
            15 => ErrorKind::StatusBytesLost,
            16 => ErrorKind::ServiceRequestStuck,
            _ => ErrorKind::Unknown,
        }
    }

    /// Human-readable description used in error messages.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::SystemCall => "system call failed",
            ErrorKind::NotControllerInCharge => {
                "interface board needs to be controller-in-charge, but is not"
            }
            ErrorKind::NoListeners => {
                "attempted to write data or command bytes, but there are no listeners currently addressed"
            }
            ErrorKind::AddressingFailure => {
                "interface board has failed to address itself properly before starting an io operation"
            }
            ErrorKind::InvalidArguments => "arguments to the function call were invalid",
            ErrorKind::NotSystemController => {
                "interface board needs to be system controller, but is not"
            }
            ErrorKind::IoAborted => "read or write of data bytes has been aborted",
            ErrorKind::BoardNotFound => "interface board does not exist",
            ErrorKind::AsyncPending => {
                "function call can not proceed due to an asynchronous IO operation"
            }
            ErrorKind::CapabilityMissing => "GPIB board lacks desired capability",
            ErrorKind::Timeout => "attempt to write command bytes to the bus has timed out",
            ErrorKind::StatusBytesLost => "serial poll status bytes have been lost",
            ErrorKind::ServiceRequestStuck => "serial poll request service line is stuck on",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Error returned by every GPIB operation.
#[derive(Error, Debug)]
pub enum GpibError {
    #[error("gpib: failed to open device (board {board}, pad {pad}, sad {sad})")]
    Open { board: i32, pad: i32, sad: i32 },

    #[error("gpib: system call failed (iberr {code}): {source}")]
    SystemCall {
        code: i32,
        #[source]
        source: io::Error,
    },

    #[error("gpib: {}", ErrorKind::NotControllerInCharge)]
    NotControllerInCharge,

    #[error("gpib: {}", ErrorKind::NoListeners)]
    NoListeners,

    #[error("gpib: {}", ErrorKind::AddressingFailure)]
    AddressingFailure,

    #[error("gpib: {}", ErrorKind::InvalidArguments)]
    InvalidArguments,

    #[error("gpib: {}", ErrorKind::NotSystemController)]
    NotSystemController,

    #[error("gpib: {}", ErrorKind::IoAborted)]
    IoAborted,

    #[error("gpib: {}", ErrorKind::BoardNotFound)]
    BoardNotFound,

    #[error("gpib: {}", ErrorKind::AsyncPending)]
    AsyncPending,

    #[error("gpib: {}", ErrorKind::CapabilityMissing)]
    CapabilityMissing,

    #[error("gpib: {}", ErrorKind::Timeout)]
    Timeout,

    #[error("gpib: {}", ErrorKind::StatusBytesLost)]
    StatusBytesLost,

    #[error("gpib: {}", ErrorKind::ServiceRequestStuck)]
    ServiceRequestStuck,

    #[error("gpib: unknown error (iberr {0})")]
    Unknown(i32),

    #[error("gpib: device has already been closed")]
    DeviceClosed,

    #[error("gpib: native driver support not enabled. Rebuild with --features linux-gpib")]
    DriverNotEnabled,
}

impl GpibError {
    /// The decoded bus error kind, if this error came from a status word.
    ///
    /// `Open`, `DeviceClosed` and `DriverNotEnabled` are raised by the core
    /// itself and have no kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            GpibError::SystemCall { .. } => ErrorKind::SystemCall,
            GpibError::NotControllerInCharge => ErrorKind::NotControllerInCharge,
            GpibError::NoListeners => ErrorKind::NoListeners,
            GpibError::AddressingFailure => ErrorKind::AddressingFailure,
            GpibError::InvalidArguments => ErrorKind::InvalidArguments,
            GpibError::NotSystemController => ErrorKind::NotSystemController,
            GpibError::IoAborted => ErrorKind::IoAborted,
            GpibError::BoardNotFound => ErrorKind::BoardNotFound,
            GpibError::AsyncPending => ErrorKind::AsyncPending,
            GpibError::CapabilityMissing => ErrorKind::CapabilityMissing,
            GpibError::Timeout => ErrorKind::Timeout,
            GpibError::StatusBytesLost => ErrorKind::StatusBytesLost,
            GpibError::ServiceRequestStuck => ErrorKind::ServiceRequestStuck,
            GpibError::Unknown(_) => ErrorKind::Unknown,
            GpibError::Open { .. } | GpibError::DeviceClosed | GpibError::DriverNotEnabled => {
                return None
            }
        };
        Some(kind)
    }

    /// OS error number carried by a `SystemCall` error.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            GpibError::SystemCall { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this is a bus timeout.
    pub fn is_timeout(&self) -> bool {
        self.kind() == Some(ErrorKind::Timeout)
    }
}
