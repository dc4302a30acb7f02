use gpibport_session::{Mode, SessionConfig};

use crate::cmd::device::serve;
use crate::cmd::PortArgs;
use crate::exit::CliResult;

pub fn run(args: PortArgs, quiet: bool) -> CliResult<i32> {
    let config = SessionConfig {
        quiet,
        read_len: usize::from(args.read_size),
        ..SessionConfig::default()
    };
    serve(&args.device, Mode::Port, config)
}
