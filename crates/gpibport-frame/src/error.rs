/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame (tag + body) exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The length prefix declared zero bytes, so there is no command tag.
    #[error("empty frame (length prefix is zero)")]
    EmptyFrame,

    /// The stream ended after part of a frame had been received.
    #[error("truncated frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// True when the peer closed its side of the stream, cleanly or mid-frame.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Truncated { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
