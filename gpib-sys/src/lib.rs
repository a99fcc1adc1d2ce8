//! Raw FFI declarations for the linux-gpib user-space library (`libgpib`).
//!
//! Only the calls used by the `gpib` crate are declared. Every `ib*` call
//! returns the status word (`ibsta`); the secondary error code and byte
//! count are thread-local in linux-gpib and must be fetched with the
//! `Thread*` accessors on the same thread, immediately after the call.
//!
//! The library is only linked with the `libgpib` feature.

#![allow(non_snake_case)]

use libc::{c_int, c_long, c_void};

extern "C" {
    /// Open a device descriptor for `pad`/`sad` on board `board_index`.
    /// Returns `-1` on failure.
    pub fn ibdev(
        board_index: c_int,
        pad: c_int,
        sad: c_int,
        timo: c_int,
        send_eoi: c_int,
        eosmode: c_int,
    ) -> c_int;

    /// Take a descriptor online (`online != 0`) or release it (`online == 0`).
    pub fn ibonl(ud: c_int, online: c_int) -> c_int;

    /// Return the device to local front-panel control.
    pub fn ibloc(ud: c_int) -> c_int;

    /// Write `count` data bytes from `buf`.
    pub fn ibwrt(ud: c_int, buf: *const c_void, count: c_long) -> c_int;

    /// Read up to `count` data bytes into `buf`.
    pub fn ibrd(ud: c_int, buf: *mut c_void, count: c_long) -> c_int;

    /// Status word of the last call made on this thread.
    pub fn ThreadIbsta() -> c_int;

    /// Secondary error code of the last call made on this thread.
    pub fn ThreadIberr() -> c_int;

    /// Byte count (or errno) of the last call made on this thread.
    pub fn ThreadIbcntl() -> c_long;
}
