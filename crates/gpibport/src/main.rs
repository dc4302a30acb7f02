mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "gpibport",
    version,
    about = "Bridge a supervisory process to a GPIB instrument over stdio"
)]
struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Suppress debug frames, the interactive tip and all diagnostics.
    #[arg(long, visible_alias = "shutup", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level, cli.quiet);

    let quiet = cli.quiet;
    match cmd::run(cli.command, quiet) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if !quiet {
                eprintln!("error: {err}");
            }
            std::process::exit(err.code);
        }
    }
}
