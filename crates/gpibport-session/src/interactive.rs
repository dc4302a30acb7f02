//! Interactive mode: one text line per command.
//!
//! A non-empty line is written to the instrument without its terminator. An
//! empty line reads from the instrument and prints the reply.

use std::io::{BufRead, Read, Write};

use gpibport_instrument::Instrument;

use crate::device::Device;
use crate::error::{Outcome, Result, SessionError};
use crate::session::SessionConfig;
use crate::sink::ResponseSink;

/// Printed to stderr before the first prompt unless quiet.
pub const TIP: &str = "Tip: press Enter on an empty line to read the instrument response";

/// Serve lines from `input` until it ends or a command fails.
pub fn run<I, R, W>(
    device: &Device<I>,
    mut input: R,
    sink: &mut ResponseSink<W>,
    config: &SessionConfig,
) -> Result<Outcome>
where
    I: Instrument,
    R: BufRead,
    W: Write,
{
    let mut line = Vec::new();
    loop {
        if !read_line(&mut input, &mut line, config.max_line_len)? {
            tracing::debug!("input closed");
            return Ok(Outcome::InputClosed);
        }

        if line.is_empty() {
            match device.read(config.max_line_len) {
                Ok(data) => sink.deliver(&data)?,
                Err(err) if err.is_timeout() => {
                    tracing::debug!(error = %err, "read timed out");
                }
                Err(err) => {
                    tracing::debug!(error = %err, "unable to read data from device");
                    return Err(SessionError::Device(err));
                }
            }
        } else if let Err(err) = device.write(&line) {
            tracing::debug!(error = %err, "unable to write to device");
            return Err(SessionError::Device(err));
        }
    }
}

/// Read one line into `line`, without its `\n` or `\r\n` terminator.
///
/// Returns `false` at end of input. A line of `max_line_len` bytes or more
/// fails with [`SessionError::LineTooLong`]; at most `max_line_len + 1` bytes
/// are consumed while finding that out.
pub fn read_line<R: BufRead>(
    input: &mut R,
    line: &mut Vec<u8>,
    max_line_len: usize,
) -> Result<bool> {
    line.clear();
    let limit = u64::try_from(max_line_len.saturating_add(1)).unwrap_or(u64::MAX);
    let n = input
        .by_ref()
        .take(limit)
        .read_until(b'\n', line)
        .map_err(SessionError::Input)?;
    if n == 0 {
        return Ok(false);
    }

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    if line.len() >= max_line_len {
        return Err(SessionError::LineTooLong {
            limit: max_line_len,
        });
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use gpibport_instrument::InstrumentError;

    use super::*;
    use crate::sink::ReceiveStrategy;
    use crate::testing::{Reply, ScriptedInstrument, WriteReply};

    fn run_lines(
        inst: ScriptedInstrument,
        input: &[u8],
        max_line_len: usize,
    ) -> (Result<Outcome>, Vec<u8>) {
        let device = Device::new(inst);
        let mut sink = ResponseSink::new(ReceiveStrategy::EchoToConsole, Vec::new(), false);
        let config = SessionConfig {
            max_line_len,
            ..SessionConfig::default()
        };
        let result = run(&device, Cursor::new(input.to_vec()), &mut sink, &config);
        (result, sink.into_inner())
    }

    #[test]
    fn empty_line_with_timeout_keeps_going() {
        let (inst, log) = ScriptedInstrument::new(vec![Reply::Timeout, Reply::Data(b"+1.000E0")]);
        let (result, out) = run_lines(inst, b"\n\n", 10240);

        assert_eq!(result.unwrap(), Outcome::InputClosed);
        assert_eq!(out, b"+1.000E0\n");
        assert_eq!(log.lock().unwrap().reads, vec![10240, 10240]);
    }

    #[test]
    fn lines_are_written_without_terminators() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let (result, out) = run_lines(inst, b"*RST\r\nMEAS:VOLT?\nLAST", 10240);

        assert_eq!(result.unwrap(), Outcome::InputClosed);
        assert!(out.is_empty());
        assert_eq!(
            log.lock().unwrap().writes,
            vec![b"*RST".to_vec(), b"MEAS:VOLT?".to_vec(), b"LAST".to_vec()]
        );
    }

    #[test]
    fn long_line_is_fatal() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let (result, _) = run_lines(inst, b"0123456789\n", 10);

        assert!(matches!(
            result,
            Err(SessionError::LineTooLong { limit: 10 })
        ));
        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn line_just_under_the_bound_is_accepted() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let (result, _) = run_lines(inst, b"012345678\n", 10);

        assert!(result.is_ok());
        assert_eq!(log.lock().unwrap().writes, vec![b"012345678".to_vec()]);
    }

    #[test]
    fn write_failure_is_fatal() {
        let (inst, _log) = ScriptedInstrument::new(Vec::new());
        let (result, _) = run_lines(inst.failing_writes(), b"*IDN?\n", 10240);
        assert!(matches!(result, Err(SessionError::Device(_))));
    }

    #[test]
    fn read_failure_ends_session_before_later_lines() {
        let (inst, log) = ScriptedInstrument::new(vec![Reply::Fail("EBUS: command error")]);
        let (result, out) = run_lines(inst, b"\n*RST\n", 10240);

        assert!(matches!(
            result,
            Err(SessionError::Device(InstrumentError::Read(_)))
        ));
        assert!(out.is_empty());
        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn write_timeout_is_fatal() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let inst = inst.with_writes(vec![WriteReply::Accept, WriteReply::Timeout]);
        let (result, _) = run_lines(inst, b"*RST\n*IDN?\n\n", 10240);

        assert!(matches!(
            result,
            Err(SessionError::Device(InstrumentError::Timeout(_)))
        ));
        let log = log.lock().unwrap();
        assert_eq!(log.writes.len(), 2);
        assert!(log.reads.is_empty());
    }

    #[test]
    fn read_line_stops_at_bound() {
        let mut input = Cursor::new(vec![b'a'; 64]);
        let mut line = Vec::new();
        let err = read_line(&mut input, &mut line, 8).unwrap_err();

        assert!(matches!(err, SessionError::LineTooLong { limit: 8 }));
        assert_eq!(input.position(), 9);
    }

    #[test]
    fn read_line_reports_end_of_input() {
        let mut input = Cursor::new(Vec::new());
        let mut line = vec![b'x'];
        assert!(!read_line(&mut input, &mut line, 8).unwrap());
        assert!(line.is_empty());
    }
}
