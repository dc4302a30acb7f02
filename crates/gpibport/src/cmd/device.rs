use std::io;
use std::sync::mpsc;
use std::time::Duration;

use gpibport_instrument::{
    open_instrument, Address, Backend, BusAddress, Instrument, LanAddress, Target,
};
use gpibport_session::{
    spawn_watcher, Device, Mode, Session, SessionConfig, DEFAULT_CANCEL_GRACE,
};

use crate::cmd::DeviceArgs;
use crate::exit::{instrument_error, session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

const DEFAULT_PAD: u8 = 1;

impl DeviceArgs {
    /// Backend plus address described by the flags.
    pub fn target(&self) -> CliResult<Target> {
        let backend = Backend::from(self.backend);
        let address = match &self.host {
            Some(host) => {
                if backend == Backend::Ni488 {
                    return Err(CliError::new(
                        USAGE,
                        "--host needs a resource-string backend (--backend visa)",
                    ));
                }
                LanAddress::new(self.board, host.clone(), self.name.clone())
                    .map(Address::Lan)
                    .map_err(|err| instrument_error("invalid address", err))?
            }
            None => BusAddress::new(self.board, self.pad.unwrap_or(DEFAULT_PAD), self.sad)
                .map(Address::Bus)
                .map_err(|err| instrument_error("invalid address", err))?,
        };
        Target::new(backend, address).map_err(|err| instrument_error("invalid address", err))
    }

    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }
}

/// Open the instrument and serve stdin/stdout until the session ends.
pub fn serve(args: &DeviceArgs, mode: Mode, config: SessionConfig) -> CliResult<i32> {
    let target = args.target()?;
    let timeout = args.timeout()?;

    let instrument = open_instrument(&target, timeout)
        .map_err(|err| instrument_error("unable to open device", err))?;
    let device = Device::new(instrument);

    if let Err(err) = install_cancel_handler(device.clone()) {
        device.close();
        return Err(err);
    }

    let session = Session::new(mode, device, io::stdout().lock(), config);
    match session.run(io::stdin().lock()) {
        Ok(_) => Ok(SUCCESS),
        Err(err) => Err(session_error(err)),
    }
}

/// Route Ctrl-C and termination signals to the cancellation watcher, which
/// closes the instrument (aborting a call in flight) and exits 0.
fn install_cancel_handler<I: Instrument + 'static>(device: Device<I>) -> CliResult<()> {
    let (tx, rx) = mpsc::channel();
    spawn_watcher(device, rx, DEFAULT_CANCEL_GRACE, || {
        std::process::exit(SUCCESS)
    })
    .map_err(|err| {
        CliError::new(INTERNAL, format!("cancellation watcher failed to start: {err}"))
    })?;

    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse `10s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
