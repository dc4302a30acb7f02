use clap::{Args, Subcommand, ValueEnum};
use gpibport_instrument::Backend;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod device;
pub mod interactive;
pub mod list;
pub mod port;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the framed bridge on stdin/stdout.
    Port(PortArgs),
    /// Run the line-oriented bridge (empty line reads a response).
    Interactive(InteractiveArgs),
    /// List instruments on the bus and exit.
    List(ListArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, quiet: bool) -> CliResult<i32> {
    match command {
        Command::Port(args) => port::run(args, quiet),
        Command::Interactive(args) => interactive::run(args, quiet),
        Command::List(args) => list::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// NI-488.2 bus driver.
    #[value(name = "ni488")]
    Ni488,
    /// VISA resource manager.
    #[value(name = "visa")]
    Visa,
    /// In-process echo instrument.
    #[value(name = "loopback")]
    Loopback,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ni488 => Backend::Ni488,
            BackendArg::Visa => Backend::Visa,
            BackendArg::Loopback => Backend::Loopback,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Instrument driver.
    #[arg(long, value_enum, default_value = "ni488", env = "GPIBPORT_BACKEND")]
    pub backend: BackendArg,
    /// GPIB board handle, or LAN interface index.
    #[arg(long, visible_alias = "handle", default_value_t = 0)]
    pub board: u32,
    /// Primary bus address (default 1).
    #[arg(long, value_name = "N")]
    pub pad: Option<u8>,
    /// Secondary bus address.
    #[arg(long, value_name = "N")]
    pub sad: Option<u8>,
    /// LAN host of a network instrument (visa backend).
    #[arg(long, visible_alias = "ip", conflicts_with_all = ["pad", "sad"])]
    pub host: Option<String>,
    /// LAN device name, e.g. inst0 (visa backend).
    #[arg(long, requires = "host")]
    pub name: Option<String>,
    /// Instrument I/O timeout (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s", env = "GPIBPORT_TIMEOUT")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct PortArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Bytes requested from the instrument per read command.
    #[arg(
        long,
        value_name = "BYTES",
        default_value = "3240",
        value_parser = clap::value_parser!(u16).range(1..=65534)
    )]
    pub read_size: u16,
}

#[derive(Args, Debug)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Instrument driver.
    #[arg(long, value_enum, default_value = "ni488", env = "GPIBPORT_BACKEND")]
    pub backend: BackendArg,
    /// GPIB board to scan.
    #[arg(long, visible_alias = "handle", default_value_t = 0)]
    pub board: u32,
    /// Per-instrument identification timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "10s", env = "GPIBPORT_TIMEOUT")]
    pub timeout: String,
    /// Output format.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build details.
    #[arg(long)]
    pub extended: bool,
}
