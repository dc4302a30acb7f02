//! Fake instruments shared by the session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use gpibport_instrument::{AbortHandle, Instrument, InstrumentError, Result};

const SCRIPTED_TIMEOUT: Duration = Duration::from_secs(10);

/// What the scripted instrument saw.
#[derive(Debug, Default)]
pub struct Log {
    pub writes: Vec<Vec<u8>>,
    pub reads: Vec<usize>,
    pub closes: usize,
}

/// Answer to one read.
pub enum Reply {
    Data(&'static [u8]),
    Timeout,
    Fail(&'static str),
}

/// Answer to one write. Writes past the end of the script are accepted.
pub enum WriteReply {
    Accept,
    Timeout,
    Fail(&'static str),
}

pub struct ScriptedInstrument {
    replies: VecDeque<Reply>,
    writes: VecDeque<WriteReply>,
    log: Arc<Mutex<Log>>,
}

impl ScriptedInstrument {
    pub fn new(replies: Vec<Reply>) -> (Self, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let inst = Self {
            replies: replies.into(),
            writes: VecDeque::new(),
            log: Arc::clone(&log),
        };
        (inst, log)
    }

    pub fn with_writes(mut self, writes: Vec<WriteReply>) -> Self {
        self.writes = writes.into();
        self
    }

    pub fn failing_writes(self) -> Self {
        self.with_writes(vec![WriteReply::Fail("ENOL: no listeners")])
    }
}

impl Instrument for ScriptedInstrument {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.log.lock().unwrap().writes.push(data.to_vec());
        match self.writes.pop_front() {
            Some(WriteReply::Accept) | None => Ok(data.len()),
            Some(WriteReply::Timeout) => Err(InstrumentError::Timeout(SCRIPTED_TIMEOUT)),
            Some(WriteReply::Fail(detail)) => Err(InstrumentError::Write(detail.to_string())),
        }
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        self.log.lock().unwrap().reads.push(max_len);
        match self.replies.pop_front() {
            Some(Reply::Data(data)) => Ok(Bytes::from_static(data)),
            Some(Reply::Fail(detail)) => Err(InstrumentError::Read(detail.to_string())),
            Some(Reply::Timeout) | None => Err(InstrumentError::Timeout(SCRIPTED_TIMEOUT)),
        }
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }

    fn describe(&self) -> String {
        "scripted GPIB0::1::INSTR".to_string()
    }
}

/// Shared between a [`StallingInstrument`] and its abort handle.
#[derive(Debug, Default)]
pub struct Stall {
    pub aborted: AtomicBool,
    pub closes: AtomicUsize,
}

impl AbortHandle for Stall {
    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

/// Reads block for the whole timeout unless the session is aborted, the way
/// a bus driver waits on a silent instrument.
pub struct StallingInstrument {
    stall: Arc<Stall>,
    timeout: Duration,
    abortable: bool,
}

impl StallingInstrument {
    pub fn new(timeout: Duration) -> (Self, Arc<Stall>) {
        let stall = Arc::new(Stall::default());
        let inst = Self {
            stall: Arc::clone(&stall),
            timeout,
            abortable: true,
        };
        (inst, stall)
    }

    pub fn without_abort(mut self) -> Self {
        self.abortable = false;
        self
    }
}

impl Instrument for StallingInstrument {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(data.len())
    }

    fn read(&mut self, _max_len: usize) -> Result<Bytes> {
        let started = Instant::now();
        while started.elapsed() < self.timeout {
            if self.stall.aborted.load(Ordering::SeqCst) {
                return Err(InstrumentError::Closed);
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(InstrumentError::Timeout(self.timeout))
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.stall.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "stalling GPIB0::1::INSTR".to_string()
    }

    fn abort_handle(&self) -> Option<Arc<dyn AbortHandle>> {
        if !self.abortable {
            return None;
        }
        let handle: Arc<dyn AbortHandle> = self.stall.clone();
        Some(handle)
    }
}
