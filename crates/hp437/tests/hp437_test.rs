//! HP 437B driver against the simulated bus

use std::sync::Arc;

use gpib::{Device, ErrorKind, Operation, Options, SimulatedBoard};
use hp437::{Hp437, Hp437Error, Units};

const PAD: i32 = 13;

fn meter() -> (Arc<SimulatedBoard>, Hp437) {
    let board = Arc::new(SimulatedBoard::new());
    board.attach(0, PAD, 0);
    let device = Device::open_with(board.clone(), 0, PAD, 0, Options::default()).unwrap();
    (board, Hp437::new(device))
}

fn sent(board: &SimulatedBoard) -> Vec<String> {
    board
        .writes(0, PAD, 0)
        .into_iter()
        .map(|w| String::from_utf8(w).unwrap())
        .collect()
}

#[test]
fn test_commands_are_byte_exact() {
    let (board, meter) = meter();

    meter.reset().unwrap();
    meter.zero().unwrap();
    meter.display_user("HI").unwrap();
    meter.offset(1.5).unwrap();
    meter.offset(-20.0).unwrap();
    meter.unit(Units::Watts).unwrap();
    meter.unit(Units::Dbm).unwrap();

    assert_eq!(
        sent(&board),
        vec![
            "*RST\r\n",
            "ZE\r\n",
            "DUHI\r\n",
            "OS1.500000EN\r\n",
            "OS-20.000000EN\r\n",
            "LN\r\n",
            "LG\r\n",
        ]
    );
}

#[test]
fn test_power_reading() {
    let (board, meter) = meter();
    board.queue_response(0, PAD, 0, b"-3.21E+00\r\n");
    assert_eq!(meter.power().unwrap(), -3.21);
}

#[test]
fn test_power_parse_error() {
    let (board, meter) = meter();
    board.queue_response(0, PAD, 0, b"ERR\r\n");
    assert!(matches!(meter.power(), Err(Hp437Error::Parse { .. })));
}

#[test]
fn test_bus_errors_pass_through() {
    let (board, meter) = meter();
    board.fail_next(Operation::Write, 2, 0);
    match meter.zero() {
        Err(Hp437Error::Bus(e)) => assert_eq!(e.kind(), Some(ErrorKind::NoListeners)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_local_and_close() {
    let (board, meter) = meter();
    meter.local().unwrap();
    assert_eq!(board.local_calls(0, PAD, 0), 1);

    meter.close().unwrap();
    meter.close().unwrap();
    assert!(meter.device().is_closed());
    assert_eq!(board.release_calls(), 1);
}
