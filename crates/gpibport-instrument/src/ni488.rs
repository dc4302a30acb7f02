//! NI-488.2 bus driver backend.
//!
//! Devices are opened with `ibdev` from a board index and primary/secondary
//! address. Every driver call reports through the thread status block
//! (`ibsta`, `iberr`, `ibcntl`), which is captured into a [`Status`] right
//! after the call.
//!
//! Without the `ni488` feature the driver calls are replaced by placeholders
//! that fail with `EDVR`, and [`Ni488Instrument::open`] reports
//! [`InstrumentError::BackendUnavailable`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use libc::c_int;

use crate::address::{Address, BusAddress, MAX_BUS_ADDRESS};
use crate::discovery::{identify, InstrumentInfo, IDN_QUERY};
use crate::error::{InstrumentError, Result};
use crate::traits::{AbortHandle, Instrument};

/// `ibsta` bit: the call failed.
pub const ERR: c_int = 0x8000;
/// `ibsta` bit: the call timed out.
pub const TIMO: c_int = 0x4000;

/// `iberr`: no driver / system error.
pub const EDVR: c_int = 0;
/// `iberr`: I/O aborted, reported on timeouts.
pub const EABO: c_int = 6;

const IBC_AUTOPOLL: c_int = 0x0007;
const NO_ADDR: u16 = 0xFFFF;
const SAD_OFFSET: u8 = 0x60;

const ERROR_MNEMONICS: [&str; 21] = [
    "EDVR", "ECIC", "ENOL", "EADR", "EARG", "ESAC", "EABO", "ENEB", "EDMA", "", "EOIP", "ECAP",
    "EFSO", "", "EBUS", "ESTB", "ESRQ", "", "", "", "ETAB",
];

/// Driver timeout codes `T10us` (1) through `T1000s` (17).
const TIMEOUT_STEPS: [Duration; 17] = [
    Duration::from_micros(10),
    Duration::from_micros(30),
    Duration::from_micros(100),
    Duration::from_micros(300),
    Duration::from_millis(1),
    Duration::from_millis(3),
    Duration::from_millis(10),
    Duration::from_millis(30),
    Duration::from_millis(100),
    Duration::from_millis(300),
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(100),
    Duration::from_secs(300),
    Duration::from_secs(1000),
];

/// Short name of an `iberr` code, e.g. `EABO`.
pub fn error_mnemonic(iberr: c_int) -> &'static str {
    usize::try_from(iberr)
        .ok()
        .and_then(|idx| ERROR_MNEMONICS.get(idx).copied())
        .filter(|name| !name.is_empty())
        .unwrap_or("UNKNOWN")
}

/// Smallest driver timeout code that is not shorter than `timeout`.
///
/// A zero duration maps to `TNONE` (0, wait forever); anything above the
/// largest step maps to `T1000s`.
pub fn timeout_code(timeout: Duration) -> c_int {
    if timeout.is_zero() {
        return 0;
    }
    TIMEOUT_STEPS
        .iter()
        .position(|step| *step >= timeout)
        .unwrap_or(TIMEOUT_STEPS.len() - 1) as c_int
        + 1
}

/// Snapshot of the driver's status block after a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub ibsta: c_int,
    pub iberr: c_int,
    pub count: usize,
}

impl Status {
    pub fn is_error(&self) -> bool {
        self.ibsta & ERR != 0
    }

    pub fn timed_out(&self) -> bool {
        self.is_error() && self.iberr == EABO
    }

    pub fn detail(&self) -> String {
        format!(
            "ibsta = {:#x} iberr = {} ({})",
            self.ibsta,
            self.iberr,
            error_mnemonic(self.iberr)
        )
    }
}

#[cfg(feature = "ni488")]
mod driver {
    use libc::{c_int, c_long, c_void};

    use super::Status;

    // Assert EOI with the last byte written; no EOS termination.
    const EOT_MODE: c_int = 1;
    const EOS_MODE: c_int = 0;

    #[cfg(windows)]
    type Count = usize;
    #[cfg(not(windows))]
    type Count = c_long;

    #[allow(non_snake_case)]
    extern "system" {
        fn ibdev(board: c_int, pad: c_int, sad: c_int, tmo: c_int, eot: c_int, eos: c_int)
            -> c_int;
        fn ibconfig(ud: c_int, option: c_int, value: c_int) -> c_int;
        fn ibclr(ud: c_int) -> c_int;
        fn ibwrt(ud: c_int, buf: *const c_void, count: Count) -> c_int;
        fn ibrd(ud: c_int, buf: *mut c_void, count: Count) -> c_int;
        fn ibonl(ud: c_int, value: c_int) -> c_int;
        fn SendIFC(board: c_int);
        fn FindLstn(board: c_int, pads: *const u16, results: *mut u16, limit: c_int);
        fn ThreadIbsta() -> c_int;
        fn ThreadIberr() -> c_int;
        fn ThreadIbcntl() -> c_long;
    }

    fn status() -> Status {
        // SAFETY: the Thread* accessors only read the calling thread's copy of
        // the status block left by the previous driver call.
        unsafe {
            Status {
                ibsta: ThreadIbsta(),
                iberr: ThreadIberr(),
                count: usize::try_from(ThreadIbcntl()).unwrap_or(0),
            }
        }
    }

    fn count(len: usize) -> Count {
        Count::try_from(len).unwrap_or(Count::MAX)
    }

    pub fn dev(board: c_int, pad: c_int, sad: c_int, tmo: c_int) -> (c_int, Status) {
        // SAFETY: plain integer arguments; the driver validates them.
        let ud = unsafe { ibdev(board, pad, sad, tmo, EOT_MODE, EOS_MODE) };
        (ud, status())
    }

    pub fn config(ud: c_int, option: c_int, value: c_int) -> Status {
        // SAFETY: plain integer arguments.
        unsafe { ibconfig(ud, option, value) };
        status()
    }

    pub fn clear(ud: c_int) -> Status {
        // SAFETY: `ud` is a descriptor returned by `ibdev`.
        unsafe { ibclr(ud) };
        status()
    }

    pub fn write(ud: c_int, data: &[u8]) -> Status {
        // SAFETY: `data` is valid for reads of `data.len()` bytes for the
        // duration of the call and the driver does not retain the pointer.
        unsafe { ibwrt(ud, data.as_ptr().cast::<c_void>(), count(data.len())) };
        status()
    }

    pub fn read(ud: c_int, buf: &mut [u8]) -> Status {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes and the
        // driver writes at most the requested count.
        unsafe { ibrd(ud, buf.as_mut_ptr().cast::<c_void>(), count(buf.len())) };
        status()
    }

    pub fn offline(ud: c_int) -> Status {
        // SAFETY: plain integer arguments.
        unsafe { ibonl(ud, 0) };
        status()
    }

    pub fn send_ifc(board: c_int) -> Status {
        // SAFETY: plain integer argument.
        unsafe { SendIFC(board) };
        status()
    }

    pub fn find_listeners(board: c_int, pads: &[u16], results: &mut [u16]) -> Status {
        let limit = c_int::try_from(results.len()).unwrap_or(c_int::MAX);
        // SAFETY: `pads` is NOADDR-terminated and `results` holds `limit`
        // entries; the driver writes no more than `limit` addresses.
        unsafe { FindLstn(board, pads.as_ptr(), results.as_mut_ptr(), limit) };
        status()
    }
}

#[cfg(not(feature = "ni488"))]
mod driver {
    use libc::c_int;

    use super::{Status, EDVR, ERR};

    fn no_driver() -> Status {
        Status {
            ibsta: ERR,
            iberr: EDVR,
            count: 0,
        }
    }

    pub fn dev(_board: c_int, _pad: c_int, _sad: c_int, _tmo: c_int) -> (c_int, Status) {
        (-1, no_driver())
    }

    pub fn config(_ud: c_int, _option: c_int, _value: c_int) -> Status {
        no_driver()
    }

    pub fn clear(_ud: c_int) -> Status {
        no_driver()
    }

    pub fn write(_ud: c_int, _data: &[u8]) -> Status {
        no_driver()
    }

    pub fn read(_ud: c_int, _buf: &mut [u8]) -> Status {
        no_driver()
    }

    pub fn offline(_ud: c_int) -> Status {
        no_driver()
    }

    pub fn send_ifc(_board: c_int) -> Status {
        no_driver()
    }

    pub fn find_listeners(_board: c_int, _pads: &[u16], _results: &mut [u16]) -> Status {
        no_driver()
    }
}

fn unavailable() -> InstrumentError {
    InstrumentError::BackendUnavailable {
        backend: "NI-488.2",
        feature: "ni488",
    }
}

fn board_index(board: u32) -> Result<c_int> {
    c_int::try_from(board)
        .map_err(|_| InstrumentError::InvalidAddress(format!("board index {board} is too large")))
}

fn sad_code(sad: Option<u8>) -> c_int {
    sad.map_or(0, |sad| c_int::from(SAD_OFFSET + sad))
}

/// Decode one entry of a `FindLstn` result list (`pad | sad << 8`).
fn decode_listener(board: u32, addr: u16) -> BusAddress {
    let [pad, sad] = addr.to_le_bytes();
    BusAddress {
        board,
        pad,
        sad: sad.checked_sub(SAD_OFFSET),
    }
}

/// The `ibdev` descriptor, shared with the abort handle.
#[derive(Debug)]
struct Descriptor {
    ud: c_int,
    online: AtomicBool,
}

impl Descriptor {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    // Only the caller that flips the flag calls ibonl.
    fn take_offline(&self) {
        if !self.online.swap(false, Ordering::AcqRel) {
            return;
        }
        let status = driver::offline(self.ud);
        if status.is_error() {
            tracing::warn!(ud = self.ud, detail = %status.detail(), "taking device offline failed");
        } else {
            tracing::debug!(ud = self.ud, "device taken offline");
        }
    }
}

impl AbortHandle for Descriptor {
    fn abort(&self) {
        self.take_offline();
    }
}

/// An open `ibdev` device descriptor.
#[derive(Debug)]
pub struct Ni488Instrument {
    descriptor: Arc<Descriptor>,
    address: BusAddress,
    timeout: Duration,
}

impl Ni488Instrument {
    /// Open the device at `address`, enabling auto serial polling on its
    /// board first.
    pub fn open(address: &BusAddress, timeout: Duration) -> Result<Self> {
        if !cfg!(feature = "ni488") {
            return Err(unavailable());
        }
        let board = board_index(address.board)?;

        let status = driver::config(board, IBC_AUTOPOLL, 1);
        if status.is_error() {
            tracing::warn!(board, detail = %status.detail(), "unable to enable auto polling");
        }

        let (ud, status) = driver::dev(
            board,
            c_int::from(address.pad),
            sad_code(address.sad),
            timeout_code(timeout),
        );
        if ud < 0 || status.is_error() {
            if ud >= 0 {
                driver::offline(ud);
            }
            return Err(InstrumentError::Open {
                address: Address::Bus(address.clone()).to_string(),
                detail: status.detail(),
            });
        }

        tracing::debug!(ud, address = %Address::Bus(address.clone()), "device opened");
        Ok(Self {
            descriptor: Arc::new(Descriptor {
                ud,
                online: AtomicBool::new(true),
            }),
            address: address.clone(),
            timeout,
        })
    }

    /// Find every listener on `board` and ask each for its identification.
    pub fn list(board: u32, timeout: Duration) -> Result<Vec<InstrumentInfo>> {
        if !cfg!(feature = "ni488") {
            return Err(unavailable());
        }
        let board_ud = board_index(board)?;

        let status = driver::send_ifc(board_ud);
        if status.is_error() {
            return Err(InstrumentError::Discovery(format!(
                "unable to clear interface on board {board}: {}",
                status.detail()
            )));
        }

        let mut pads: Vec<u16> = (1..=u16::from(MAX_BUS_ADDRESS)).collect();
        pads.push(NO_ADDR);
        let mut results = vec![NO_ADDR; pads.len()];

        let status = driver::find_listeners(board_ud, &pads, &mut results);
        if status.is_error() {
            return Err(InstrumentError::Discovery(format!(
                "unable to find listeners on board {board}: {}",
                status.detail()
            )));
        }

        let found = status.count.min(results.len());
        tracing::debug!(board, found, "listeners found");

        Ok(results[..found]
            .iter()
            .map(|&addr| {
                let address = decode_listener(board, addr);
                let identity = Self::open(&address, timeout)
                    .and_then(|mut device| {
                        device.clear()?;
                        identify(&mut device, IDN_QUERY)
                    })
                    .map_err(|err| {
                        tracing::warn!(
                            address = %Address::Bus(address.clone()),
                            error = %err,
                            "identification failed"
                        );
                    })
                    .ok();
                InstrumentInfo {
                    address: Address::Bus(address).to_string(),
                    identity,
                }
            })
            .collect())
    }

    fn ensure_online(&self) -> Result<c_int> {
        if self.descriptor.is_online() {
            Ok(self.descriptor.ud)
        } else {
            Err(InstrumentError::Closed)
        }
    }
}

impl Instrument for Ni488Instrument {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let ud = self.ensure_online()?;
        let status = driver::write(ud, data);
        if status.timed_out() {
            return Err(InstrumentError::Timeout(self.timeout));
        }
        if status.is_error() {
            return Err(InstrumentError::Write(status.detail()));
        }
        Ok(status.count)
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        let ud = self.ensure_online()?;
        let mut buf = BytesMut::zeroed(max_len);
        let status = driver::read(ud, &mut buf);
        if status.timed_out() {
            return Err(InstrumentError::Timeout(self.timeout));
        }
        if status.is_error() {
            return Err(InstrumentError::Read(status.detail()));
        }
        buf.truncate(status.count.min(max_len));
        Ok(buf.freeze())
    }

    fn clear(&mut self) -> Result<()> {
        let ud = self.ensure_online()?;
        let status = driver::clear(ud);
        if status.is_error() {
            return Err(InstrumentError::Clear(status.detail()));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.descriptor.take_offline();
    }

    fn describe(&self) -> String {
        format!("ni488 {}", Address::Bus(self.address.clone()))
    }

    fn abort_handle(&self) -> Option<Arc<dyn AbortHandle>> {
        let handle: Arc<dyn AbortHandle> = self.descriptor.clone();
        Some(handle)
    }
}

impl Drop for Ni488Instrument {
    fn drop(&mut self) {
        self.close();
    }
}
