use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::{InstrumentError, Result};
use crate::traits::Instrument;

/// Identification returned by the loopback instrument in listings.
pub const LOOPBACK_IDENTITY: &str = concat!("gpibport,loopback,0,", env!("CARGO_PKG_VERSION"));

/// In-process instrument that answers every read with what was written.
///
/// A read with nothing pending fails immediately with a timeout, which makes
/// it convenient for exercising the bridge without hardware.
#[derive(Debug)]
pub struct LoopbackInstrument {
    label: String,
    pending: BytesMut,
    timeout: Duration,
    open: bool,
}

impl LoopbackInstrument {
    pub fn new(label: impl Into<String>, timeout: Duration) -> Self {
        Self {
            label: label.into(),
            pending: BytesMut::new(),
            timeout,
            open: true,
        }
    }

    /// Bytes written but not yet read back.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(InstrumentError::Closed)
        }
    }
}

impl Instrument for LoopbackInstrument {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        self.pending.extend_from_slice(data);
        Ok(data.len())
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Err(InstrumentError::Timeout(self.timeout));
        }
        let n = max_len.min(self.pending.len());
        Ok(self.pending.split_to(n).freeze())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            tracing::debug!(instrument = %self.label, "loopback closed");
        }
        self.open = false;
        self.pending.clear();
    }

    fn describe(&self) -> String {
        format!("loopback {}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument() -> LoopbackInstrument {
        LoopbackInstrument::new("GPIB0::1::INSTR", Duration::from_secs(10))
    }

    #[test]
    fn reads_back_written_bytes_in_chunks() {
        let mut inst = instrument();
        assert_eq!(inst.write(b"MEAS:VOLT?").unwrap(), 10);

        assert_eq!(inst.read(4).unwrap().as_ref(), b"MEAS");
        assert_eq!(inst.read(64).unwrap().as_ref(), b":VOLT?");
        assert!(inst.pending().is_empty());
    }

    #[test]
    fn empty_read_times_out() {
        let mut inst = instrument();
        let err = inst.read(16).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn clear_discards_pending_output() {
        let mut inst = instrument();
        inst.write(b"*IDN?").unwrap();
        inst.clear().unwrap();
        assert!(inst.read(16).unwrap_err().is_timeout());
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let mut inst = instrument();
        inst.close();
        inst.close();
        assert!(!inst.is_open());
        assert!(matches!(inst.write(b"x"), Err(InstrumentError::Closed)));
        assert!(inst.describe().contains("GPIB0::1::INSTR"));
    }
}
