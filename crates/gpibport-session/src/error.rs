use gpibport_frame::FrameError;
use gpibport_instrument::InstrumentError;

/// Errors that end a session abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The instrument rejected a write, or a read failed for a reason other
    /// than a timeout.
    #[error("device error: {0}")]
    Device(#[from] InstrumentError),

    /// The response stream could not be written.
    #[error("output error: {0}")]
    Output(#[from] FrameError),

    /// An interactive line reached the configured bound.
    #[error("input line too long (limit {limit} bytes)")]
    LineTooLong { limit: usize },

    /// Reading interactive input failed.
    #[error("input error: {0}")]
    Input(#[source] std::io::Error),
}

/// How a session ended when it ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The parent sent a shutdown command.
    Shutdown,
    /// The parent sent a tag that is not a command.
    UnknownCommand(u8),
    /// The input stream ended, cleanly or with a malformed frame.
    InputClosed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
