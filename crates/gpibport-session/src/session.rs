use std::io::{BufRead, Write};

use gpibport_frame::{FrameReader, MAX_BODY_LEN};
use gpibport_instrument::Instrument;

use crate::device::Device;
use crate::error::{Outcome, Result};
use crate::sink::{ReceiveStrategy, ResponseSink};
use crate::{interactive, port};

/// Bytes requested from the instrument per port-mode read command.
pub const DEFAULT_READ_LEN: usize = 3240;

/// Interactive lines of this many bytes or more end the session.
pub const DEFAULT_MAX_LINE_LEN: usize = 10240;

/// How the parent talks to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Length-prefixed binary frames.
    Port,
    /// Text lines from a human.
    Interactive,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Port => "port",
            Mode::Interactive => "interactive",
        }
    }
}

/// Session behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Suppress debug frames.
    pub quiet: bool,
    /// Bytes requested per port-mode read.
    pub read_len: usize,
    /// Interactive line bound.
    pub max_line_len: usize,
}

impl SessionConfig {
    /// Read length actually used, so that a response always fits in one frame.
    pub fn effective_read_len(&self) -> usize {
        self.read_len.clamp(1, MAX_BODY_LEN)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            read_len: DEFAULT_READ_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// One run of the bridge against one open instrument.
pub struct Session<I, W> {
    mode: Mode,
    device: Device<I>,
    sink: ResponseSink<W>,
    config: SessionConfig,
}

impl<I: Instrument, W: Write> Session<I, W> {
    pub fn new(mode: Mode, device: Device<I>, output: W, config: SessionConfig) -> Self {
        let sink = ResponseSink::new(ReceiveStrategy::for_mode(mode), output, config.quiet);
        Self {
            mode,
            device,
            sink,
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Serve commands from `input` until the session ends.
    ///
    /// The instrument is closed on every path out of this call.
    pub fn run<R: BufRead>(mut self, input: R) -> Result<Outcome> {
        tracing::info!(
            mode = self.mode.name(),
            instrument = self.device.describe().as_deref().unwrap_or("closed"),
            "session started"
        );

        let result = match self.mode {
            Mode::Port => {
                let mut reader = FrameReader::new(input);
                port::run(&self.device, &mut reader, &mut self.sink, &self.config)
            }
            Mode::Interactive => interactive::run(&self.device, input, &mut self.sink, &self.config),
        };

        self.device.close();
        match &result {
            Ok(outcome) => tracing::info!(?outcome, "session ended"),
            Err(err) => tracing::debug!(error = %err, "session failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use gpibport_instrument::LoopbackInstrument;

    use super::*;
    use crate::error::SessionError;
    use crate::testing::{Reply, ScriptedInstrument};

    fn quiet() -> SessionConfig {
        SessionConfig {
            quiet: true,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn defaults_match_bridge_buffer_sizes() {
        let config = SessionConfig::default();
        assert_eq!(config.read_len, 3240);
        assert_eq!(config.max_line_len, 10240);
        assert!(!config.quiet);
    }

    #[test]
    fn read_len_is_clamped_to_a_frame() {
        let config = SessionConfig {
            read_len: 1 << 20,
            ..SessionConfig::default()
        };
        assert_eq!(config.effective_read_len(), MAX_BODY_LEN);

        let config = SessionConfig {
            read_len: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.effective_read_len(), 1);
    }

    #[test]
    fn port_session_writes_then_reads_then_shuts_down() {
        let (inst, log) = ScriptedInstrument::new(vec![Reply::Data(b"DATA")]);
        let device = Device::new(inst);
        let mut out = Vec::new();

        let input = [
            &[0x00, 0x06, 0x00, b'H', b'E', b'L', b'L', b'O'][..],
            &[0x00, 0x01, 0x01],
            &[0x00, 0x01, 0x03],
        ]
        .concat();

        let outcome = Session::new(Mode::Port, device.clone(), &mut out, quiet())
            .run(Cursor::new(input))
            .unwrap();

        assert_eq!(outcome, Outcome::Shutdown);
        assert_eq!(out, vec![0x00, 0x05, 0x01, 0x44, 0x41, 0x54, 0x41]);
        let log = log.lock().unwrap();
        assert_eq!(log.writes, vec![b"HELLO".to_vec()]);
        assert_eq!(log.reads, vec![DEFAULT_READ_LEN]);
        assert_eq!(log.closes, 1);
        assert!(!device.is_open());
    }

    #[test]
    fn device_is_closed_after_fatal_error() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let device = Device::new(inst.failing_writes());
        let mut out = Vec::new();

        let err = Session::new(Mode::Port, device, &mut out, quiet())
            .run(Cursor::new(vec![0x00, 0x02, 0x00, b'X']))
            .unwrap_err();

        assert!(matches!(err, SessionError::Device(_)));
        assert_eq!(log.lock().unwrap().closes, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn interactive_session_over_loopback() {
        let device = Device::new(LoopbackInstrument::new("LOOP", Duration::from_secs(1)));
        let mut out = Vec::new();

        let outcome = Session::new(Mode::Interactive, device, &mut out, quiet())
            .run(Cursor::new(b"*IDN?\n\n\n".to_vec()))
            .unwrap();

        assert_eq!(outcome, Outcome::InputClosed);
        assert_eq!(out, b"*IDN?\n");
    }
}
