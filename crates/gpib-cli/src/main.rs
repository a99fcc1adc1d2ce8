//! `gpib` - talk to an instrument on the bus from the shell.
//!
//! ```text
//! gpib --pad 13 write "*RST"
//! gpib --pad 22 query "*IDN?"
//! gpib --simulate power --unit dbm
//! RUST_LOG=gpib=trace gpib read --max 4096
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gpib::config::GpibConfig;
use gpib::{Device, Options, SimulatedBoard};
use hp437::{Hp437, Units};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Reply the simulated instrument gives to every read.
const SIMULATED_REPLY: &[u8] = b"-12.345E+00\r\n";

#[derive(Parser, Debug)]
#[command(name = "gpib", version, about = "Talk to GPIB instruments")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "gpib.toml")]
    config: PathBuf,

    /// Interface board index (overrides config)
    #[arg(long)]
    board: Option<i32>,

    /// Primary address (overrides config)
    #[arg(long)]
    pad: Option<i32>,

    /// Secondary address (overrides config)
    #[arg(long)]
    sad: Option<i32>,

    /// Use an in-memory board instead of real hardware
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a command string
    Write {
        text: String,
        /// Appended to the text before sending
        #[arg(long, default_value = "\r\n")]
        terminator: String,
    },
    /// Read one response
    Read {
        /// Receive buffer size; longer replies are truncated
        #[arg(long, default_value_t = 1024)]
        max: usize,
    },
    /// Send a command and read the response
    Query {
        text: String,
        #[arg(long, default_value = "\r\n")]
        terminator: String,
        #[arg(long, default_value_t = 1024)]
        max: usize,
    },
    /// Return the instrument to front-panel control
    Local,
    /// Read power from an HP 437B
    Power {
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
    },
    /// Soft-reset an HP 437B
    Reset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum UnitArg {
    Watts,
    Dbm,
}

impl From<UnitArg> for Units {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Watts => Units::Watts,
            UnitArg::Dbm => Units::Dbm,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = GpibConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(board) = cli.board {
        config.device.board = board;
    }
    if let Some(pad) = cli.pad {
        config.device.primary_address = pad;
    }
    if let Some(sad) = cli.sad {
        config.device.secondary_address = sad;
    }
    config.validate().context("Invalid device address")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let device = open(&config, cli.simulate)?;
    info!(address = %device.address(), "device open");

    // On error the device is released when dropped.
    execute(device, cli.command)
}

fn open(config: &GpibConfig, simulate: bool) -> Result<Device> {
    let d = config.device;
    let device = if simulate {
        let board = Arc::new(SimulatedBoard::new());
        board.add_board(d.board);
        board.attach(d.board, d.primary_address, d.secondary_address);
        for _ in 0..16 {
            board.queue_response(d.board, d.primary_address, d.secondary_address, SIMULATED_REPLY);
        }
        Device::open_with(board, d.board, d.primary_address, d.secondary_address, Options::default())
    } else {
        Device::open(d.board, d.primary_address, d.secondary_address, Options::default())
    };
    device.context("Failed to open device")
}

fn read_reply(device: &Device, max: usize) -> Result<String> {
    let mut buf = vec![0u8; max];
    let n = device.read(&mut buf).context("Read failed")?;
    Ok(String::from_utf8_lossy(&buf[..n]).trim_end().to_string())
}

fn power(meter: Hp437, unit: Option<UnitArg>) -> Result<()> {
    let units = unit.map(Units::from);
    if let Some(units) = units {
        meter.unit(units).context("Failed to select units")?;
    }
    let reading = meter.power().context("Failed to read power")?;
    match units {
        Some(units) => println!("{reading} {units}"),
        None => println!("{reading}"),
    }
    meter.close()?;
    Ok(())
}

fn execute(device: Device, command: Command) -> Result<()> {
    match command {
        Command::Write { text, terminator } => {
            let n = device
                .write(format!("{text}{terminator}").as_bytes())
                .context("Write failed")?;
            info!(bytes = n, "sent");
        }
        Command::Read { max } => println!("{}", read_reply(&device, max)?),
        Command::Query {
            text,
            terminator,
            max,
        } => {
            device
                .write(format!("{text}{terminator}").as_bytes())
                .context("Write failed")?;
            println!("{}", read_reply(&device, max)?);
        }
        Command::Local => device.local().context("Local failed")?,
        Command::Power { unit } => return power(Hp437::new(device), unit),
        Command::Reset => {
            let meter = Hp437::new(device);
            meter.reset().context("Reset failed")?;
            meter.close()?;
            return Ok(());
        }
    }
    device.close().context("Failed to release device")
}
