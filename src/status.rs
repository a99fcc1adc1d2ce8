//! Status word decoding.
//!
//! Every native bus call yields an `ibsta` status word. Bit 15 (`ERR`)
//! reports failure; when it is set the thread's `iberr` selects the error
//! and, for system-call failures, `ibcntl` holds the OS error number.
//! [`decode`] is the only place those three values become a `GpibError`.

use std::io;

use bitflags::bitflags;

use crate::error::{ErrorKind, GpibError, GpibResult};

bitflags! {
    /// The `ibsta` status word, linux-gpib bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u16 {
        /// Device clear state
        const DCAS = 0x0001;
        /// Device trigger state
        const DTAS = 0x0002;
        /// Board is listener
        const LACS = 0x0004;
        /// Board is talker
        const TACS = 0x0008;
        /// ATN line asserted
        const ATN = 0x0010;
        /// Board is controller-in-charge
        const CIC = 0x0020;
        /// Remote state
        const REM = 0x0040;
        /// Lockout state
        const LOK = 0x0080;
        /// I/O completed
        const CMPL = 0x0100;
        /// Device requesting service
        const RQS = 0x0800;
        /// SRQ line asserted
        const SRQI = 0x1000;
        /// END or EOS detected
        const END = 0x2000;
        /// Time limit exceeded
        const TIMO = 0x4000;
        /// Error
        const ERR = 0x8000;
    }
}

impl StatusWord {
    /// Interpret the raw integer returned by an `ib*` call.
    ///
    /// Only the low 16 bits carry status; higher bits are dropped.
    pub fn from_raw(raw: i32) -> Self {
        StatusWord::from_bits_retain(raw as u16)
    }

    /// Whether the failure bit is set.
    pub fn is_err(self) -> bool {
        self.contains(StatusWord::ERR)
    }
}

/// Raw outcome of a single native call, as read back from the driver.
///
/// Transient: it is decoded right away and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// `ibsta` after the call.
    pub status: StatusWord,
    /// `iberr` after the call; meaningful only when `status` has `ERR`.
    pub iberr: i32,
    /// `ibcntl` after the call: bytes transferred, or errno on system errors.
    pub count: i64,
}

impl Outcome {
    /// A successful outcome that transferred `count` bytes.
    pub fn complete(count: usize) -> Self {
        Self {
            status: StatusWord::CMPL,
            iberr: 0,
            count: count as i64,
        }
    }

    /// A failed outcome carrying `iberr` and `count`.
    pub fn failed(iberr: i32, count: i64) -> Self {
        Self {
            status: StatusWord::ERR | StatusWord::CMPL,
            iberr,
            count,
        }
    }

    /// Decode into the number of bytes the driver reported.
    pub fn into_result(self) -> GpibResult<usize> {
        decode(self.status, self.iberr, self.count)?;
        Ok(usize::try_from(self.count).unwrap_or(0))
    }
}

/// Decode a status word into success or a typed error.
///
/// With `ERR` clear this is `Ok(())` whatever `iberr` holds. With `ERR` set,
/// `iberr` picks the variant; codes 0 and 12 wrap `count` as an OS error
/// number.
pub fn decode(status: StatusWord, iberr: i32, count: i64) -> GpibResult<()> {
    if !status.is_err() {
        return Ok(());
    }

    let err = match ErrorKind::from_code(iberr) {
        ErrorKind::SystemCall => GpibError::SystemCall {
            code: iberr,
            source: io::Error::from_raw_os_error(count as i32),
        },
        ErrorKind::NotControllerInCharge => GpibError::NotControllerInCharge,
        ErrorKind::NoListeners => GpibError::NoListeners,
        ErrorKind::AddressingFailure => GpibError::AddressingFailure,
        ErrorKind::InvalidArguments => GpibError::InvalidArguments,
        ErrorKind::NotSystemController => GpibError::NotSystemController,
        ErrorKind::IoAborted => GpibError::IoAborted,
        ErrorKind::BoardNotFound => GpibError::BoardNotFound,
        ErrorKind::AsyncPending => GpibError::AsyncPending,
        ErrorKind::CapabilityMissing => GpibError::CapabilityMissing,
        ErrorKind::Timeout => GpibError::Timeout,
        ErrorKind::StatusBytesLost => GpibError::StatusBytesLost,
        ErrorKind::ServiceRequestStuck => GpibError::ServiceRequestStuck,
        ErrorKind::Unknown => GpibError::Unknown(iberr),
    };
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(i32, ErrorKind)] = &[
        (0, ErrorKind::SystemCall),
        (1, ErrorKind::NotControllerInCharge),
        (2, ErrorKind::NoListeners),
        (3, ErrorKind::AddressingFailure),
        (4, ErrorKind::InvalidArguments),
        (5, ErrorKind::NotSystemController),
        (6, ErrorKind::IoAborted),
        (7, ErrorKind::BoardNotFound),
        (10, ErrorKind::AsyncPending),
        (11, ErrorKind::CapabilityMissing),
        (12, ErrorKind::SystemCall),
        (14, ErrorKind::Timeout),
        (15, ErrorKind::StatusBytesLost),
        (16, ErrorKind::ServiceRequestStuck),
    ];

    #[test]
    fn test_err_bit_clear_is_success() {
        let quiet = [
            StatusWord::empty(),
            StatusWord::CMPL,
            StatusWord::CMPL | StatusWord::END,
            StatusWord::TIMO | StatusWord::CMPL,
            StatusWord::all() - StatusWord::ERR,
        ];
        for status in quiet {
            for iberr in [-1, 0, 2, 14, 99] {
                assert!(decode(status, iberr, 0).is_ok(), "{status:?} iberr {iberr}");
            }
        }
    }

    #[test]
    fn test_every_table_code_maps_to_its_kind() {
        for &(code, kind) in TABLE {
            let err = decode(StatusWord::ERR, code, 5).unwrap_err();
            assert_eq!(err.kind(), Some(kind), "iberr {code}");
        }
    }

    #[test]
    fn test_codes_outside_table_are_unknown() {
        for code in [8, 9, 13, 17, 255, -3, i32::MAX, i32::MIN] {
            let err = decode(StatusWord::ERR, code, 0).unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::Unknown));
            assert!(matches!(err, GpibError::Unknown(c) if c == code));
        }
    }

    #[test]
    fn test_system_call_wraps_count_as_errno() {
        // EACCES
        let err = decode(StatusWord::ERR, 0, 13).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(13));

        let err = decode(StatusWord::ERR, 12, 2).unwrap_err();
        assert!(matches!(err, GpibError::SystemCall { code: 12, .. }));
        assert_eq!(err.raw_os_error(), Some(2));
    }

    #[test]
    fn test_from_raw_uses_bit_15() {
        assert!(StatusWord::from_raw(0x8100).is_err());
        assert!(!StatusWord::from_raw(0x2100).is_err());
        // sign-extended negative ibsta still carries ERR
        assert!(StatusWord::from_raw(-32512).is_err());
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::complete(6).into_result().unwrap(), 6);
        let err = Outcome::failed(14, 0).into_result().unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_outcome_count_follows_err_bit() {
        // ERR clear: iberr is stale and ignored
        let stale = Outcome {
            status: StatusWord::CMPL | StatusWord::END,
            iberr: 14,
            count: 13,
        };
        assert_eq!(stale.into_result().unwrap(), 13);

        // a negative count never becomes a huge length
        let odd = Outcome {
            status: StatusWord::CMPL,
            iberr: 0,
            count: -1,
        };
        assert_eq!(odd.into_result().unwrap(), 0);

        let err = Outcome::failed(0, 5).into_result().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(5));
    }
}
