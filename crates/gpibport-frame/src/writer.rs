use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, FrameConfig, LENGTH_PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::io::write_full;

/// Writes complete frames to any `Write` stream.
///
/// Each frame is assembled in one buffer and handed to the stream as a single
/// write sequence followed by a flush, so a reader never sees a prefix without
/// its payload.
#[derive(Debug)]
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Encode and send a body under a tag.
    pub fn send(&mut self, tag: u8, body: &[u8]) -> Result<()> {
        let max_body = self.config.max_body_len();
        if body.len() > max_body {
            return Err(FrameError::FrameTooLarge {
                size: 1 + body.len(),
                max: max_body + 1,
            });
        }

        self.buf.clear();
        self.buf.reserve(LENGTH_PREFIX_SIZE + 1 + body.len());
        encode_frame(tag, body, &mut self.buf)?;

        match write_full(&mut self.inner, &self.buf) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::WriteZero => {
                return Err(FrameError::ConnectionClosed)
            }
            Err(err) => return Err(FrameError::Io(err)),
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
