//! Integration tests for Device I/O against the simulated board
//!
//! Covers the read truncation policy, all-or-nothing writes, status
//! decoding on every operation and lifecycle observation.

#![cfg(feature = "mock")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gpib::{Device, ErrorKind, GpibError, Lifecycle, Operation, Options, SimulatedBoard};

fn open_meter(board: &Arc<SimulatedBoard>) -> Device {
    board.attach(0, 13, 0);
    Device::open_with(board.clone(), 0, 13, 0, Options::default()).expect("open failed")
}

#[test]
fn test_write_returns_full_length() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);

    let payloads: [&[u8]; 3] = [b"ZE\r\n", b"*RST\r\n", &[0x55; 4096]];
    for payload in payloads {
        assert_eq!(dev.write(payload).unwrap(), payload.len());
    }
    assert_eq!(board.writes(0, 13, 0).len(), 3);
}

#[test]
fn test_write_without_listener_is_no_listeners() {
    let board = Arc::new(SimulatedBoard::new());
    // nothing attached at pad 4
    let dev = Device::open_with(board.clone(), 0, 4, 0, Options::default()).unwrap();
    let err = dev.write(b"*RST\r\n").unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NoListeners));
}

#[test]
fn test_injected_no_listeners_on_write() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    board.fail_next(Operation::Write, 2, 0);
    assert!(matches!(dev.write(b"ZE\r\n"), Err(GpibError::NoListeners)));
}

#[test]
fn test_timeout_on_any_operation() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    let mut buf = [0u8; 16];

    board.fail_next(Operation::Write, 14, 0);
    assert!(dev.write(b"x").unwrap_err().is_timeout());

    board.fail_next(Operation::Read, 14, 0);
    assert!(dev.read(&mut buf).unwrap_err().is_timeout());

    board.fail_next(Operation::Local, 14, 0);
    assert!(dev.local().unwrap_err().is_timeout());

    board.fail_next(Operation::Release, 14, 0);
    assert!(dev.close().unwrap_err().is_timeout());
    assert!(!dev.is_closed());
}

#[test]
fn test_read_truncates_to_caller_buffer() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    board.queue_response(0, 13, 0, b"-12.345E+00\r\n");
    board.queue_response(0, 13, 0, b"OK\n");

    let mut small = [0u8; 4];
    assert_eq!(dev.read(&mut small).unwrap(), 4);
    assert_eq!(&small, b"-12.");

    // the tail of the first reply is gone
    let mut buf = [0u8; 64];
    let n = dev.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"OK\n");
}

#[test]
fn test_read_returns_reported_count_when_buffer_is_large() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    board.queue_response(0, 13, 0, b"1.000E-03\n");

    let mut buf = [0u8; 1024];
    assert_eq!(dev.read(&mut buf).unwrap(), 10);

    board.queue_response(0, 13, 0, b"exact");
    let mut exact = [0u8; 5];
    assert_eq!(dev.read(&mut exact).unwrap(), 5);
}

#[test]
fn test_read_with_nothing_to_say_is_aborted() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    let mut buf = [0u8; 8];
    assert_eq!(dev.read(&mut buf).unwrap_err().kind(), Some(ErrorKind::IoAborted));
}

#[test]
fn test_unknown_code_does_not_panic() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    board.fail_next(Operation::Write, 9, 0);
    let err = dev.write(b"x").unwrap_err();
    assert!(matches!(err, GpibError::Unknown(9)));
}

#[test]
fn test_close_cancels_lifecycle_before_release() {
    let board = Arc::new(SimulatedBoard::new());
    let parent = Lifecycle::new();
    board.attach(0, 13, 0);
    let dev = Device::open_with(
        board.clone(),
        0,
        13,
        0,
        Options::default().with_base(parent.clone()),
    )
    .unwrap();

    let observer = dev.lifecycle().clone();
    assert!(!observer.is_cancelled());
    dev.close().unwrap();
    assert!(observer.is_cancelled());
    assert!(!parent.is_cancelled());
}

#[test]
fn test_parent_cancellation_does_not_close_device() {
    let board = Arc::new(SimulatedBoard::new());
    let parent = Lifecycle::new();
    board.attach(0, 13, 0);
    let dev = Device::open_with(
        board.clone(),
        0,
        13,
        0,
        Options::default().with_base(parent.clone()),
    )
    .unwrap();

    parent.cancel();
    assert!(dev.lifecycle().is_cancelled());
    // still usable: the signal is observational only
    assert_eq!(dev.write(b"ZE\r\n").unwrap(), 4);
    assert!(!dev.is_closed());
}

#[test]
fn test_close_racing_writes_never_uses_released_descriptor() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = Arc::new(open_meter(&board));

    let writer = {
        let dev = dev.clone();
        thread::spawn(move || {
            let mut outcomes = Vec::new();
            for _ in 0..200 {
                outcomes.push(dev.write(b"DU HELLO\r\n"));
            }
            outcomes
        })
    };

    thread::sleep(Duration::from_millis(1));
    dev.close().unwrap();

    for outcome in writer.join().unwrap() {
        match outcome {
            Ok(n) => assert_eq!(n, 10),
            Err(e) => assert!(matches!(e, GpibError::DeviceClosed), "unexpected {e}"),
        }
    }
    assert_eq!(board.release_calls(), 1);
    assert_eq!(board.open_descriptors(), 0);
}

#[tokio::test]
async fn test_lifecycle_observer_wakes_on_close() {
    let board = Arc::new(SimulatedBoard::new());
    let dev = open_meter(&board);
    let lifecycle = dev.lifecycle().clone();

    let watcher = tokio::spawn(async move {
        lifecycle.cancelled().await;
        "torn down"
    });

    dev.close().unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("watcher not woken")
        .unwrap();
    assert_eq!(result, "torn down");
}
