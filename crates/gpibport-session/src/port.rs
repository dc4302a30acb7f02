//! Port mode: the framed command dispatcher.
//!
//! Each iteration decodes one frame and acts on its tag:
//!
//! | Tag      | Action                                   |
//! |----------|------------------------------------------|
//! | WRITE    | write the body (empty body: nothing)     |
//! | READ     | read and answer with a READ frame        |
//! | SHUTDOWN | end the session                          |
//! | other    | end the session, naming the tag          |
//!
//! Read timeouts are not errors; every other instrument failure is fatal.
//! The end of input, clean or mid-frame, ends the session without emitting
//! anything further.

use std::io::{Read, Write};

use gpibport_frame::{CommandTag, Frame, FrameReader};
use gpibport_instrument::Instrument;

use crate::device::Device;
use crate::error::{Outcome, Result, SessionError};
use crate::session::SessionConfig;
use crate::sink::ResponseSink;

/// Serve frames from `reader` until a command or the input ends the session.
pub fn run<I, R, W>(
    device: &Device<I>,
    reader: &mut FrameReader<R>,
    sink: &mut ResponseSink<W>,
    config: &SessionConfig,
) -> Result<Outcome>
where
    I: Instrument,
    R: Read,
    W: Write,
{
    let read_len = config.effective_read_len();
    sink.debug("port mode started")?;

    loop {
        sink.debug("waiting for command")?;
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_end_of_stream() => {
                tracing::debug!(error = %err, "command stream ended");
                return Ok(Outcome::InputClosed);
            }
            Err(err) => {
                tracing::warn!(error = %err, "unreadable command frame, ending session");
                return Ok(Outcome::InputClosed);
            }
        };

        if let Some(outcome) = dispatch(device, sink, &frame, read_len)? {
            return Ok(outcome);
        }
    }
}

/// Act on one decoded frame. Returns `Some` when the session should end.
pub fn dispatch<I, W>(
    device: &Device<I>,
    sink: &mut ResponseSink<W>,
    frame: &Frame,
    read_len: usize,
) -> Result<Option<Outcome>>
where
    I: Instrument,
    W: Write,
{
    let command = frame.command();
    tracing::debug!(
        command = command.name(),
        body_len = frame.body.len(),
        "command received"
    );
    sink.debug(&format!("received {} command", command.name()))?;

    match command {
        CommandTag::WriteToInstrument => {
            if frame.body.is_empty() {
                return Ok(None);
            }
            if let Err(err) = device.write(&frame.body) {
                tracing::debug!(error = %err, "unable to write to device");
                return Err(SessionError::Device(err));
            }
            Ok(None)
        }
        CommandTag::ReadFromInstrument => {
            read_and_forward(device, sink, read_len)?;
            Ok(None)
        }
        CommandTag::Shutdown => Ok(Some(Outcome::Shutdown)),
        CommandTag::DebugMessage | CommandTag::Unknown(_) => {
            tracing::warn!(tag = frame.tag, "unknown command tag, ending session");
            Ok(Some(Outcome::UnknownCommand(frame.tag)))
        }
    }
}

fn read_and_forward<I, W>(
    device: &Device<I>,
    sink: &mut ResponseSink<W>,
    read_len: usize,
) -> Result<()>
where
    I: Instrument,
    W: Write,
{
    sink.debug("reading from device")?;
    match device.read(read_len) {
        Ok(data) => {
            sink.debug("sending response")?;
            sink.deliver(&data)?;
            Ok(())
        }
        Err(err) if err.is_timeout() => {
            tracing::debug!(error = %err, "read timed out, no response sent");
            Ok(())
        }
        Err(err) => {
            tracing::debug!(error = %err, "unable to read data from device");
            Err(SessionError::Device(err))
        }
    }
}
