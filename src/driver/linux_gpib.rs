//! linux-gpib driver backed by `libgpib`.

#![allow(unsafe_code)]

use std::ffi::{c_int, c_long, c_void};

use super::{BusDriver, Descriptor};
use crate::status::{Outcome, StatusWord};

// ibdev timeout, send_eoi and eos arguments; all disabled.
const TNONE: c_int = 0;
const NO_EOI: c_int = 0;
const NO_EOS: c_int = 0;

/// Driver for boards managed by the linux-gpib kernel module.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxGpib;

impl LinuxGpib {
    /// Read back the thread-local status after an `ib*` call.
    ///
    /// Must run on the same thread, right after the call.
    fn outcome(rv: c_int) -> Outcome {
        // SAFETY: the Thread* accessors only read thread-local driver state.
        let (iberr, count) = unsafe { (gpib_sys::ThreadIberr(), gpib_sys::ThreadIbcntl()) };
        Outcome {
            status: StatusWord::from_raw(rv),
            iberr,
            count: count as i64,
        }
    }
}

impl BusDriver for LinuxGpib {
    fn name(&self) -> &str {
        "linux-gpib"
    }

    fn open(&self, board: i32, pad: i32, sad: i32) -> Option<Descriptor> {
        // SAFETY: plain integer arguments.
        let ud = unsafe { gpib_sys::ibdev(board, pad, sad, TNONE, NO_EOI, NO_EOS) };
        (ud >= 0).then(|| Descriptor::from_raw(ud))
    }

    fn release(&self, ud: Descriptor) -> Outcome {
        // SAFETY: `ud` came from ibdev and has not been released.
        let rv = unsafe { gpib_sys::ibonl(ud.raw(), 0) };
        Self::outcome(rv)
    }

    fn go_to_local(&self, ud: Descriptor) -> Outcome {
        // SAFETY: `ud` came from ibdev and has not been released.
        let rv = unsafe { gpib_sys::ibloc(ud.raw()) };
        Self::outcome(rv)
    }

    fn write(&self, ud: Descriptor, data: &[u8]) -> Outcome {
        // SAFETY: the driver reads exactly `data.len()` bytes from `data`.
        let rv = unsafe {
            gpib_sys::ibwrt(
                ud.raw(),
                data.as_ptr() as *const c_void,
                data.len() as c_long,
            )
        };
        Self::outcome(rv)
    }

    fn read(&self, ud: Descriptor, buf: &mut [u8]) -> Outcome {
        // SAFETY: the driver writes at most `buf.len()` bytes into `buf`.
        let rv = unsafe {
            gpib_sys::ibrd(
                ud.raw(),
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as c_long,
            )
        };
        Self::outcome(rv)
    }
}
