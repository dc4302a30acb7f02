use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use gpibport_instrument::{AbortHandle, Instrument, InstrumentError, Result};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Shared handle to the open instrument.
///
/// The dispatch loop does all I/O through it; the cancellation watcher holds
/// a clone only to close it. Closing takes the instrument out, so the
/// backend's `close` runs at most once and later calls fail with
/// [`InstrumentError::Closed`].
///
/// The backend's abort handle is kept outside the lock, so [`Device::cancel`]
/// can end the driver session while a read or write still holds it.
pub struct Device<I> {
    inner: Arc<Mutex<Option<I>>>,
    abort: Option<Arc<dyn AbortHandle>>,
}

impl<I> Clone for Device<I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            abort: self.abort.clone(),
        }
    }
}

impl<I> fmt::Debug for Device<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("abortable", &self.abort.is_some())
            .finish_non_exhaustive()
    }
}

impl<I: Instrument> Device<I> {
    pub fn new(instrument: I) -> Self {
        let abort = instrument.abort_handle();
        Self {
            inner: Arc::new(Mutex::new(Some(instrument))),
            abort,
        }
    }

    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.with(|inst| inst.write(data))
    }

    pub fn read(&self, max_len: usize) -> Result<Bytes> {
        self.with(|inst| inst.read(max_len))
    }

    pub fn clear(&self) -> Result<()> {
        self.with(|inst| inst.clear())
    }

    /// Close the instrument. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let taken = self.lock().take();
        Self::close_taken(taken)
    }

    /// Close without waiting out an in-flight call.
    ///
    /// Waits at most `grace` for the I/O lock. If the lock is still held
    /// after that, the driver session is ended through the abort handle and
    /// the instrument itself is left to the thread holding the lock.
    /// Returns `false` if there was nothing left to close.
    pub fn cancel(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            match self.inner.try_lock() {
                Ok(mut guard) => return Self::close_taken(guard.take()),
                Err(TryLockError::Poisoned(poisoned)) => {
                    return Self::close_taken(poisoned.into_inner().take())
                }
                Err(TryLockError::WouldBlock) if Instant::now() < deadline => {
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(TryLockError::WouldBlock) => break,
            }
        }

        match &self.abort {
            Some(abort) => {
                tracing::warn!(?grace, "instrument busy, aborting driver session");
                abort.abort();
                true
            }
            None => {
                tracing::warn!(?grace, "instrument busy and cannot be aborted");
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Address of the instrument, or `None` once closed.
    pub fn describe(&self) -> Option<String> {
        self.lock().as_ref().map(|inst| inst.describe())
    }

    fn close_taken(taken: Option<I>) -> bool {
        match taken {
            Some(mut inst) => {
                tracing::debug!(instrument = %inst.describe(), "closing instrument");
                inst.close();
                true
            }
            None => false,
        }
    }

    fn with<T>(&self, op: impl FnOnce(&mut I) -> Result<T>) -> Result<T> {
        match self.lock().as_mut() {
            Some(inst) => op(inst),
            None => Err(InstrumentError::Closed),
        }
    }

    // A panic while holding the lock leaves the Option intact; keep using it.
    fn lock(&self) -> MutexGuard<'_, Option<I>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
