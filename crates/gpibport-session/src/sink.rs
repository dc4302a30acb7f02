use std::io::Write;

use gpibport_frame::io::write_full;
use gpibport_frame::{FrameError, FrameWriter, Result, DEBUG_MESSAGE, READ_FROM_INSTRUMENT};

use crate::session::Mode;

/// Where bytes read from the instrument go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStrategy {
    /// Print as text followed by a newline.
    EchoToConsole,
    /// Send as a read-response frame.
    ForwardAsFrame,
}

impl ReceiveStrategy {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Port => Self::ForwardAsFrame,
            Mode::Interactive => Self::EchoToConsole,
        }
    }
}

/// Sole writer of the session's output stream.
#[derive(Debug)]
pub struct ResponseSink<W> {
    strategy: ReceiveStrategy,
    writer: FrameWriter<W>,
    quiet: bool,
}

impl<W: Write> ResponseSink<W> {
    pub fn new(strategy: ReceiveStrategy, output: W, quiet: bool) -> Self {
        Self {
            strategy,
            writer: FrameWriter::new(output),
            quiet,
        }
    }

    pub fn strategy(&self) -> ReceiveStrategy {
        self.strategy
    }

    /// Hand bytes read from the instrument to the parent.
    pub fn deliver(&mut self, data: &[u8]) -> Result<()> {
        match self.strategy {
            ReceiveStrategy::ForwardAsFrame => self.writer.send(READ_FROM_INSTRUMENT, data),
            ReceiveStrategy::EchoToConsole => {
                let out = self.writer.get_mut();
                write_full(out, data).map_err(FrameError::Io)?;
                write_full(out, b"\n").map_err(FrameError::Io)?;
                self.writer.flush()
            }
        }
    }

    /// Emit an advisory debug frame. Does nothing when quiet or when the
    /// output is a console.
    pub fn debug(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.strategy != ReceiveStrategy::ForwardAsFrame {
            return Ok(());
        }
        self.writer.send(DEBUG_MESSAGE, message.as_bytes())
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
