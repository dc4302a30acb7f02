use std::fmt;
use std::io;

use gpibport_frame::FrameError;
use gpibport_instrument::InstrumentError;
use gpibport_session::SessionError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

pub fn instrument_error(context: &str, err: InstrumentError) -> CliError {
    match err {
        InstrumentError::InvalidAddress(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn session_error(err: SessionError) -> CliError {
    match err {
        SessionError::Device(err) => instrument_error("device error", err),
        SessionError::Output(err) => frame_error("unable to write response", err),
        SessionError::Input(err) => io_error("unable to read input", err),
        other @ SessionError::LineTooLong { .. } => CliError::new(FAILURE, other.to_string()),
    }
}
