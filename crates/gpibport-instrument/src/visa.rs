//! VISA resource-manager backend.
//!
//! Instruments are addressed by resource string (`GPIB0::1::INSTR`,
//! `TCPIP0::10.0.0.5::inst0::INSTR`, ...). A session owns both the default
//! resource manager and the instrument session opened through it.
//!
//! Without the `visa` feature the library calls are placeholders that fail
//! with `VI_ERROR_LIBRARY_NFOUND`.

use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::discovery::{identify, InstrumentInfo};
use crate::error::{InstrumentError, Result};
use crate::traits::{AbortHandle, Instrument};

pub type ViStatus = i32;
pub type ViSession = u32;

pub const VI_SUCCESS: ViStatus = 0;
pub const VI_ERROR_TMO: ViStatus = 0xBFFF_0015_u32 as i32;
pub const VI_ERROR_RSRC_NFOUND: ViStatus = 0xBFFF_0011_u32 as i32;
pub const VI_ERROR_LIBRARY_NFOUND: ViStatus = 0xBFFF_009E_u32 as i32;

/// Identification query for message-based resources.
const VISA_IDN_QUERY: &[u8] = b"*IDN?\n";
const FIND_ALL_INSTRUMENTS: &str = "?*INSTR";

pub fn succeeded(status: ViStatus) -> bool {
    status >= VI_SUCCESS
}

/// Readable form of a VISA status code.
pub fn status_name(status: ViStatus) -> String {
    match status {
        VI_SUCCESS => "VI_SUCCESS".to_string(),
        VI_ERROR_TMO => "VI_ERROR_TMO".to_string(),
        VI_ERROR_RSRC_NFOUND => "VI_ERROR_RSRC_NFOUND".to_string(),
        VI_ERROR_LIBRARY_NFOUND => "VI_ERROR_LIBRARY_NFOUND".to_string(),
        other => format!("{:#010x}", other as u32),
    }
}

fn status_detail(vi: ViSession, status: ViStatus) -> String {
    match driver::status_text(vi, status) {
        Some(text) => format!("{} ({text})", status_name(status)),
        None => status_name(status),
    }
}

#[cfg(feature = "visa")]
mod driver {
    use std::ffi::{CStr, CString};

    use libc::c_char;

    use super::{succeeded, ViSession, ViStatus, VI_SUCCESS};

    const VI_NULL: u32 = 0;
    const VI_ATTR_TMO_VALUE: u32 = 0x3FFF_001A;
    const VI_FIND_BUFLEN: usize = 256;

    #[allow(non_snake_case)]
    extern "system" {
        fn viOpenDefaultRM(vi: *mut ViSession) -> ViStatus;
        fn viOpen(
            sesn: ViSession,
            name: *const c_char,
            mode: u32,
            timeout: u32,
            vi: *mut ViSession,
        ) -> ViStatus;
        fn viClose(vi: ViSession) -> ViStatus;
        fn viClear(vi: ViSession) -> ViStatus;
        fn viWrite(vi: ViSession, buf: *const u8, count: u32, ret_count: *mut u32) -> ViStatus;
        fn viRead(vi: ViSession, buf: *mut u8, count: u32, ret_count: *mut u32) -> ViStatus;
        fn viSetAttribute(vi: ViSession, attr: u32, value: usize) -> ViStatus;
        fn viFindRsrc(
            sesn: ViSession,
            expr: *const c_char,
            list: *mut ViSession,
            count: *mut u32,
            desc: *mut c_char,
        ) -> ViStatus;
        fn viFindNext(list: ViSession, desc: *mut c_char) -> ViStatus;
        fn viStatusDesc(vi: ViSession, status: ViStatus, desc: *mut c_char) -> ViStatus;
    }

    fn clamp(len: usize) -> u32 {
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    fn text(buf: &[c_char]) -> String {
        // SAFETY: the buffer was zero-initialised and VISA writes a
        // NUL-terminated string shorter than VI_FIND_BUFLEN.
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    pub fn open_default_rm() -> Result<ViSession, ViStatus> {
        let mut rm: ViSession = 0;
        // SAFETY: `rm` is a valid out-pointer for the duration of the call.
        let status = unsafe { viOpenDefaultRM(&mut rm) };
        if succeeded(status) {
            Ok(rm)
        } else {
            Err(status)
        }
    }

    pub fn open(rm: ViSession, resource: &CString) -> Result<ViSession, ViStatus> {
        let mut vi: ViSession = 0;
        // SAFETY: `resource` is NUL-terminated and `vi` is a valid out-pointer.
        let status = unsafe { viOpen(rm, resource.as_ptr(), VI_NULL, VI_NULL, &mut vi) };
        if succeeded(status) {
            Ok(vi)
        } else {
            Err(status)
        }
    }

    pub fn close(vi: ViSession) -> ViStatus {
        // SAFETY: closing an already-closed handle only returns an error status.
        unsafe { viClose(vi) }
    }

    pub fn clear(vi: ViSession) -> ViStatus {
        // SAFETY: plain handle argument.
        unsafe { viClear(vi) }
    }

    pub fn write(vi: ViSession, data: &[u8]) -> (ViStatus, usize) {
        let mut written: u32 = 0;
        // SAFETY: `data` is readable for the clamped count and `written` is a
        // valid out-pointer.
        let status = unsafe { viWrite(vi, data.as_ptr(), clamp(data.len()), &mut written) };
        (status, written as usize)
    }

    pub fn read(vi: ViSession, buf: &mut [u8]) -> (ViStatus, usize) {
        let mut got: u32 = 0;
        // SAFETY: `buf` is writable for the clamped count and `got` is a valid
        // out-pointer.
        let status = unsafe { viRead(vi, buf.as_mut_ptr(), clamp(buf.len()), &mut got) };
        (status, got as usize)
    }

    pub fn set_timeout(vi: ViSession, millis: u32) -> ViStatus {
        // SAFETY: plain value arguments.
        unsafe { viSetAttribute(vi, VI_ATTR_TMO_VALUE, millis as usize) }
    }

    pub fn find_resources(rm: ViSession, expr: &CString) -> Result<Vec<String>, ViStatus> {
        let mut list: ViSession = 0;
        let mut count: u32 = 0;
        let mut desc = [0 as c_char; VI_FIND_BUFLEN];
        // SAFETY: `expr` is NUL-terminated, the out-pointers are valid and
        // `desc` has the VI_FIND_BUFLEN capacity VISA requires.
        let status =
            unsafe { viFindRsrc(rm, expr.as_ptr(), &mut list, &mut count, desc.as_mut_ptr()) };
        if !succeeded(status) {
            return Err(status);
        }
        if count == 0 {
            close(list);
            return Ok(Vec::new());
        }

        let mut found = Vec::with_capacity(count as usize);
        found.push(text(&desc));
        for _ in 1..count {
            desc.fill(0);
            // SAFETY: `list` came from a successful viFindRsrc and `desc` has
            // VI_FIND_BUFLEN capacity.
            let status = unsafe { viFindNext(list, desc.as_mut_ptr()) };
            if !succeeded(status) {
                tracing::warn!(status, "unable to fetch next resource");
                continue;
            }
            found.push(text(&desc));
        }
        close(list);
        Ok(found)
    }

    pub fn status_text(vi: ViSession, status: ViStatus) -> Option<String> {
        let mut desc = [0 as c_char; VI_FIND_BUFLEN];
        // SAFETY: `desc` has the 256-byte capacity viStatusDesc requires.
        let rc = unsafe { viStatusDesc(vi, status, desc.as_mut_ptr()) };
        (rc == VI_SUCCESS).then(|| text(&desc))
    }
}

#[cfg(not(feature = "visa"))]
mod driver {
    use std::ffi::CString;

    use super::{ViSession, ViStatus, VI_ERROR_LIBRARY_NFOUND};

    pub fn open_default_rm() -> Result<ViSession, ViStatus> {
        Err(VI_ERROR_LIBRARY_NFOUND)
    }

    pub fn open(_rm: ViSession, _resource: &CString) -> Result<ViSession, ViStatus> {
        Err(VI_ERROR_LIBRARY_NFOUND)
    }

    pub fn close(_vi: ViSession) -> ViStatus {
        VI_ERROR_LIBRARY_NFOUND
    }

    pub fn clear(_vi: ViSession) -> ViStatus {
        VI_ERROR_LIBRARY_NFOUND
    }

    pub fn write(_vi: ViSession, _data: &[u8]) -> (ViStatus, usize) {
        (VI_ERROR_LIBRARY_NFOUND, 0)
    }

    pub fn read(_vi: ViSession, _buf: &mut [u8]) -> (ViStatus, usize) {
        (VI_ERROR_LIBRARY_NFOUND, 0)
    }

    pub fn set_timeout(_vi: ViSession, _millis: u32) -> ViStatus {
        VI_ERROR_LIBRARY_NFOUND
    }

    pub fn find_resources(_rm: ViSession, _expr: &CString) -> Result<Vec<String>, ViStatus> {
        Err(VI_ERROR_LIBRARY_NFOUND)
    }

    pub fn status_text(_vi: ViSession, _status: ViStatus) -> Option<String> {
        None
    }
}

fn unavailable() -> InstrumentError {
    InstrumentError::BackendUnavailable {
        backend: "VISA",
        feature: "visa",
    }
}

fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// Both VISA handles, shared with the abort handle.
#[derive(Debug)]
struct Handles {
    rm: ViSession,
    vi: ViSession,
    resource: String,
    open: AtomicBool,
}

impl Handles {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn release(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        for (what, handle) in [("instrument", self.vi), ("resource manager", self.rm)] {
            let status = driver::close(handle);
            if !succeeded(status) {
                tracing::warn!(
                    resource = %self.resource,
                    what,
                    status = %status_name(status),
                    "close failed"
                );
            }
        }
        tracing::debug!(resource = %self.resource, "resource closed");
    }
}

impl AbortHandle for Handles {
    fn abort(&self) {
        self.release();
    }
}

/// A resource-manager session plus the instrument session opened from it.
#[derive(Debug)]
pub struct VisaInstrument {
    handles: Arc<Handles>,
    timeout: Duration,
}

impl VisaInstrument {
    /// Open `resource` through the default resource manager.
    pub fn open(resource: &str, timeout: Duration) -> Result<Self> {
        if !cfg!(feature = "visa") {
            return Err(unavailable());
        }
        let c_resource = CString::new(resource).map_err(|_| {
            InstrumentError::InvalidAddress(format!("resource {resource:?} contains a NUL byte"))
        })?;

        let rm = driver::open_default_rm().map_err(|status| InstrumentError::Open {
            address: resource.to_string(),
            detail: format!(
                "could not open a session to the VISA resource manager: {}",
                status_name(status)
            ),
        })?;

        let vi = match driver::open(rm, &c_resource) {
            Ok(vi) => vi,
            Err(status) => {
                let detail = status_detail(rm, status);
                driver::close(rm);
                return Err(InstrumentError::Open {
                    address: resource.to_string(),
                    detail,
                });
            }
        };

        let status = driver::set_timeout(vi, timeout_millis(timeout));
        if !succeeded(status) {
            tracing::warn!(resource, status = %status_name(status), "unable to set timeout");
        }

        tracing::debug!(resource, "resource opened");
        Ok(Self {
            handles: Arc::new(Handles {
                rm,
                vi,
                resource: resource.to_string(),
                open: AtomicBool::new(true),
            }),
            timeout,
        })
    }

    /// Enumerate `?*INSTR` resources, identifying GPIB and TCPIP instruments.
    pub fn list(timeout: Duration) -> Result<Vec<InstrumentInfo>> {
        if !cfg!(feature = "visa") {
            return Err(unavailable());
        }
        let rm = driver::open_default_rm().map_err(|status| {
            InstrumentError::Discovery(format!(
                "could not open a session to the VISA resource manager: {}",
                status_name(status)
            ))
        })?;

        let expr = CString::new(FIND_ALL_INSTRUMENTS)
            .map_err(|err| InstrumentError::Discovery(err.to_string()))?;
        let resources = match driver::find_resources(rm, &expr) {
            Ok(resources) => resources,
            Err(VI_ERROR_RSRC_NFOUND) => Vec::new(),
            Err(status) => {
                let detail = status_detail(rm, status);
                driver::close(rm);
                return Err(InstrumentError::Discovery(format!(
                    "error finding resources: {detail}"
                )));
            }
        };
        driver::close(rm);

        Ok(resources
            .into_iter()
            .map(|resource| {
                let identity = if is_message_based(&resource) {
                    Self::open(&resource, timeout)
                        .and_then(|mut inst| identify(&mut inst, VISA_IDN_QUERY))
                        .map_err(|err| {
                            tracing::warn!(resource = %resource, error = %err, "identification failed");
                        })
                        .ok()
                } else {
                    None
                };
                InstrumentInfo {
                    address: resource,
                    identity,
                }
            })
            .collect())
    }

    fn ensure_open(&self) -> Result<ViSession> {
        if self.handles.is_open() {
            Ok(self.handles.vi)
        } else {
            Err(InstrumentError::Closed)
        }
    }
}

fn is_message_based(resource: &str) -> bool {
    resource.starts_with("GPIB") || resource.starts_with("TCPIP")
}

impl Instrument for VisaInstrument {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let vi = self.ensure_open()?;
        let (status, written) = driver::write(vi, data);
        if status == VI_ERROR_TMO {
            return Err(InstrumentError::Timeout(self.timeout));
        }
        if !succeeded(status) {
            return Err(InstrumentError::Write(status_detail(vi, status)));
        }
        Ok(written)
    }

    fn read(&mut self, max_len: usize) -> Result<Bytes> {
        let vi = self.ensure_open()?;
        let mut buf = BytesMut::zeroed(max_len);
        let (status, got) = driver::read(vi, &mut buf);
        if status == VI_ERROR_TMO {
            return Err(InstrumentError::Timeout(self.timeout));
        }
        if !succeeded(status) {
            return Err(InstrumentError::Read(status_detail(vi, status)));
        }
        buf.truncate(got.min(max_len));
        Ok(buf.freeze())
    }

    fn clear(&mut self) -> Result<()> {
        let vi = self.ensure_open()?;
        let status = driver::clear(vi);
        if !succeeded(status) {
            return Err(InstrumentError::Clear(status_detail(vi, status)));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.handles.release();
    }

    fn describe(&self) -> String {
        format!("visa {}", self.handles.resource)
    }

    fn abort_handle(&self) -> Option<Arc<dyn AbortHandle>> {
        let handle: Arc<dyn AbortHandle> = self.handles.clone();
        Some(handle)
    }
}

impl Drop for VisaInstrument {
    fn drop(&mut self) {
        self.close();
    }
}
