use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Ends a driver session from a thread that does not own the instrument.
///
/// The owning thread may be blocked inside a driver call when this runs.
/// After [`AbortHandle::abort`] the instrument reports
/// [`InstrumentError::Closed`](crate::InstrumentError::Closed) and its own
/// `close` releases nothing further.
pub trait AbortHandle: Send + Sync {
    fn abort(&self);
}

/// The capability set the bridge needs from an instrument driver.
///
/// A value of this type is an *open* session: construction is the backend's
/// `open`, and [`Instrument::close`] ends it. Implementations must tolerate
/// `close` being called more than once.
pub trait Instrument: Send {
    /// Send `data` to the instrument. Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read at most `max_len` bytes.
    ///
    /// Fails with [`InstrumentError::Timeout`](crate::InstrumentError::Timeout)
    /// when nothing arrives within the configured timeout.
    fn read(&mut self, max_len: usize) -> Result<Bytes>;

    /// Issue a device clear.
    fn clear(&mut self) -> Result<()>;

    /// Release the driver session. Best-effort: failures are logged, never
    /// returned.
    fn close(&mut self);

    /// Address of the instrument, for diagnostics.
    fn describe(&self) -> String;

    /// Handle that can end the session while an I/O call is in flight.
    ///
    /// Backends whose calls return immediately have nothing to abort.
    fn abort_handle(&self) -> Option<Arc<dyn AbortHandle>> {
        None
    }
}

impl<I: Instrument + ?Sized> Instrument for Box<I> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        (**self).read(max_len)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn abort_handle(&self) -> Option<Arc<dyn AbortHandle>> {
        (**self).abort_handle()
    }
}
