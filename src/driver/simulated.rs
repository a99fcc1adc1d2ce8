//! In-memory bus controller.
//!
//! `SimulatedBoard` behaves like a linux-gpib board with scripted
//! instruments attached. It is used by the test suites and by the CLI's
//! `--simulate` mode.
//!
//! ```
//! use std::sync::Arc;
//! use gpib::{Device, Options, SimulatedBoard};
//!
//! let board = Arc::new(SimulatedBoard::new());
//! board.attach(0, 13, 0);
//! board.queue_response(0, 13, 0, b"-12.34E+00\r\n");
//!
//! let dev = Device::open_with(board.clone(), 0, 13, 0, Options::default())?;
//! dev.write(b"*RST\r\n")?;
//! let mut buf = [0u8; 64];
//! let n = dev.read(&mut buf)?;
//! assert_eq!(&buf[..n], b"-12.34E+00\r\n");
//! assert_eq!(board.writes(0, 13, 0), vec![b"*RST\r\n".to_vec()]);
//! # Ok::<(), gpib::GpibError>(())
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tracing::trace;

use super::{BusDriver, Descriptor};
use crate::status::{Outcome, StatusWord};

// iberr values produced by the simulation
const ENOL: i32 = 2;
const EABO: i32 = 6;

// linux-gpib reserves the low descriptors for boards
const FIRST_DEVICE_DESCRIPTOR: i32 = 16;

/// Native operation that can have a failure injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `ibonl(ud, 0)`
    Release,
    /// `ibloc`
    Local,
    /// `ibwrt`
    Write,
    /// `ibrd`
    Read,
}

type Address = (i32, i32, i32);

#[derive(Debug, Default)]
struct Instrument {
    responses: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    local_calls: usize,
}

#[derive(Debug)]
struct BoardState {
    boards: HashSet<i32>,
    instruments: HashMap<Address, Instrument>,
    open: HashMap<i32, Address>,
    next_descriptor: i32,
    failures: HashMap<Operation, VecDeque<(i32, i64)>>,
    release_calls: usize,
}

/// Simulated GPIB board with scripted instruments.
#[derive(Debug)]
pub struct SimulatedBoard {
    state: Mutex<BoardState>,
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBoard {
    /// A simulation with interface board 0 present and nothing attached.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BoardState {
                boards: HashSet::from([0]),
                instruments: HashMap::new(),
                open: HashMap::new(),
                next_descriptor: FIRST_DEVICE_DESCRIPTOR,
                failures: HashMap::new(),
                release_calls: 0,
            }),
        }
    }

    /// Make interface board `board` present.
    pub fn add_board(&self, board: i32) {
        self.state.lock().boards.insert(board);
    }

    /// Remove interface board `board`; opening devices on it will fail.
    pub fn remove_board(&self, board: i32) {
        self.state.lock().boards.remove(&board);
    }

    /// Attach a listening instrument at the given address.
    pub fn attach(&self, board: i32, pad: i32, sad: i32) {
        self.state
            .lock()
            .instruments
            .entry((board, pad, sad))
            .or_default();
    }

    /// Queue a reply for the next read from the instrument at the address.
    ///
    /// Attaches the instrument if needed.
    pub fn queue_response(&self, board: i32, pad: i32, sad: i32, response: &[u8]) {
        self.state
            .lock()
            .instruments
            .entry((board, pad, sad))
            .or_default()
            .responses
            .push_back(response.to_vec());
    }

    /// Make the next `op` on any descriptor fail with `iberr` and `count`.
    ///
    /// Injected failures are consumed in FIFO order, one per call.
    pub fn fail_next(&self, op: Operation, iberr: i32, count: i64) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back((iberr, count));
    }

    /// Every buffer written to the instrument at the address, in order.
    pub fn writes(&self, board: i32, pad: i32, sad: i32) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .instruments
            .get(&(board, pad, sad))
            .map(|i| i.writes.clone())
            .unwrap_or_default()
    }

    /// How many times the instrument at the address was sent to local.
    pub fn local_calls(&self, board: i32, pad: i32, sad: i32) -> usize {
        self.state
            .lock()
            .instruments
            .get(&(board, pad, sad))
            .map_or(0, |i| i.local_calls)
    }

    /// Total `ibonl(ud, 0)` calls, successful or not.
    pub fn release_calls(&self) -> usize {
        self.state.lock().release_calls
    }

    /// Number of descriptors currently held open.
    pub fn open_descriptors(&self) -> usize {
        self.state.lock().open.len()
    }

    fn injected(state: &mut BoardState, op: Operation) -> Option<Outcome> {
        state
            .failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .map(|(iberr, count)| Outcome::failed(iberr, count))
    }
}

impl BusDriver for SimulatedBoard {
    fn name(&self) -> &str {
        "simulated"
    }

    fn open(&self, board: i32, pad: i32, sad: i32) -> Option<Descriptor> {
        let mut state = self.state.lock();
        if !state.boards.contains(&board) {
            return None;
        }
        let ud = state.next_descriptor;
        state.next_descriptor += 1;
        state.open.insert(ud, (board, pad, sad));
        Some(Descriptor::from_raw(ud))
    }

    fn release(&self, ud: Descriptor) -> Outcome {
        let mut state = self.state.lock();
        state.release_calls += 1;
        if let Some(failure) = Self::injected(&mut state, Operation::Release) {
            return failure;
        }
        // EARG for descriptors we never handed out
        match state.open.remove(&ud.raw()) {
            Some(_) => Outcome::complete(0),
            None => Outcome::failed(4, 0),
        }
    }

    fn go_to_local(&self, ud: Descriptor) -> Outcome {
        let mut state = self.state.lock();
        if let Some(failure) = Self::injected(&mut state, Operation::Local) {
            return failure;
        }
        let Some(address) = state.open.get(&ud.raw()).copied() else {
            return Outcome::failed(4, 0);
        };
        if let Some(instrument) = state.instruments.get_mut(&address) {
            instrument.local_calls += 1;
        }
        Outcome::complete(0)
    }

    fn write(&self, ud: Descriptor, data: &[u8]) -> Outcome {
        let mut state = self.state.lock();
        if let Some(failure) = Self::injected(&mut state, Operation::Write) {
            return failure;
        }
        let Some(address) = state.open.get(&ud.raw()).copied() else {
            return Outcome::failed(4, 0);
        };
        match state.instruments.get_mut(&address) {
            Some(instrument) => {
                trace!(ud = ud.raw(), bytes = data.len(), "simulated write");
                instrument.writes.push(data.to_vec());
                Outcome::complete(data.len())
            }
            None => Outcome::failed(ENOL, 0),
        }
    }

    fn read(&self, ud: Descriptor, buf: &mut [u8]) -> Outcome {
        let mut state = self.state.lock();
        if let Some(failure) = Self::injected(&mut state, Operation::Read) {
            return failure;
        }
        let Some(address) = state.open.get(&ud.raw()).copied() else {
            return Outcome::failed(4, 0);
        };
        let response = state
            .instruments
            .get_mut(&address)
            .and_then(|i| i.responses.pop_front());
        match response {
            Some(response) => {
                let n = response.len().min(buf.len());
                buf[..n].copy_from_slice(&response[..n]);
                trace!(ud = ud.raw(), bytes = response.len(), "simulated read");
                // Report the full reply length, as a driver that received
                // more than the caller asked for would.
                Outcome {
                    status: StatusWord::CMPL | StatusWord::END,
                    iberr: 0,
                    count: response.len() as i64,
                }
            }
            None => Outcome {
                status: StatusWord::ERR | StatusWord::TIMO | StatusWord::CMPL,
                iberr: EABO,
                count: 0,
            },
        }
    }
}
