use std::io::Read;

use bytes::{Buf, BytesMut};

use crate::codec::{check_frame_len, Frame, FrameConfig, LENGTH_PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::io::read_full;

/// Reads complete frames from any `Read` stream.
///
/// Reads exactly the length prefix and then exactly the declared frame, so
/// nothing past the current frame is consumed from the stream.
#[derive(Debug)]
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary and `Err(FrameError::Truncated { .. })` when it is
    /// reached inside one.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let got = read_full(&mut self.inner, &mut prefix)?;
        if got == 0 {
            return Err(FrameError::ConnectionClosed);
        }
        if got < LENGTH_PREFIX_SIZE {
            return Err(FrameError::Truncated {
                expected: LENGTH_PREFIX_SIZE,
                received: got,
            });
        }

        let frame_len = u16::from_be_bytes(prefix) as usize;
        check_frame_len(frame_len, self.config.effective_max_frame_len())?;

        let mut buf = BytesMut::zeroed(frame_len);
        let got = read_full(&mut self.inner, &mut buf)?;
        if got < frame_len {
            return Err(FrameError::Truncated {
                expected: frame_len,
                received: got,
            });
        }

        let tag = buf.get_u8();
        tracing::trace!(tag, len = frame_len, "decoded frame");
        Ok(Frame {
            tag,
            body: buf.freeze(),
        })
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
