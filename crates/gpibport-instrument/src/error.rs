use std::time::Duration;

/// Errors reported by instrument backends.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    /// The backend could not open a session to the instrument.
    #[error("unable to open {address}: {detail}")]
    Open { address: String, detail: String },

    /// Device clear failed after open.
    #[error("unable to clear device: {0}")]
    Clear(String),

    /// A write was rejected by the driver.
    #[error("unable to write to device: {0}")]
    Write(String),

    /// A read failed for a reason other than a timeout.
    #[error("unable to read data from device: {0}")]
    Read(String),

    /// The driver gave up waiting for the instrument.
    #[error("device timed out after {0:?}")]
    Timeout(Duration),

    /// The instrument has already been closed.
    #[error("instrument is closed")]
    Closed,

    /// The backend was not compiled into this build.
    #[error("{backend} support is not compiled in (rebuild with the `{feature}` feature)")]
    BackendUnavailable {
        backend: &'static str,
        feature: &'static str,
    },

    /// The address cannot be used with the selected backend.
    #[error("invalid instrument address: {0}")]
    InvalidAddress(String),

    /// Instrument enumeration failed.
    #[error("instrument discovery failed: {0}")]
    Discovery(String),
}

impl InstrumentError {
    /// Timeouts are recoverable; every other error ends the session.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, InstrumentError>;
