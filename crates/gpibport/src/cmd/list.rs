use gpibport_instrument::{list_instruments, Backend};

use crate::cmd::device::parse_duration;
use crate::cmd::ListArgs;
use crate::exit::{instrument_error, io_error, CliResult, SUCCESS};
use crate::output::{print_instruments, OutputFormat};

pub fn run(args: ListArgs) -> CliResult<i32> {
    let backend = Backend::from(args.backend);
    let timeout = parse_duration(&args.timeout)?;
    let format = args.format.unwrap_or_else(OutputFormat::default_for_stdout);

    let found = list_instruments(backend, args.board, timeout)
        .map_err(|err| instrument_error("unable to list instruments", err))?;
    tracing::info!(backend = %backend, count = found.len(), "listing complete");

    print_instruments(backend.name(), &found, format)
        .map_err(|err| io_error("unable to write listing", err))?;
    Ok(SUCCESS)
}
