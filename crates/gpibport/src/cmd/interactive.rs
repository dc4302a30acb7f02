use gpibport_session::interactive::TIP;
use gpibport_session::{Mode, SessionConfig};

use crate::cmd::device::serve;
use crate::cmd::InteractiveArgs;
use crate::exit::CliResult;

pub fn run(args: InteractiveArgs, quiet: bool) -> CliResult<i32> {
    let config = SessionConfig {
        quiet,
        ..SessionConfig::default()
    };
    // Validate flags before telling the user how to drive the session.
    args.device.target()?;
    args.device.timeout()?;
    if !quiet {
        eprintln!("{TIP}");
    }
    serve(&args.device, Mode::Interactive, config)
}
