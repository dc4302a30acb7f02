//! Instrument addressing.
//!
//! The bus driver addresses a device by board index plus primary/secondary
//! address. The resource manager takes a composed descriptor string:
//!
//! ```text
//! GPIB[board]::primary[::secondary]::INSTR
//! TCPIP[board]::host[::lan device name]::INSTR
//! ```

use std::fmt;

use crate::error::{InstrumentError, Result};

/// Highest valid GPIB primary or secondary address.
pub const MAX_BUS_ADDRESS: u8 = 30;

/// Board + primary/secondary address on a GPIB bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusAddress {
    pub board: u32,
    pub pad: u8,
    pub sad: Option<u8>,
}

impl BusAddress {
    pub fn new(board: u32, pad: u8, sad: Option<u8>) -> Result<Self> {
        if pad > MAX_BUS_ADDRESS {
            return Err(InstrumentError::InvalidAddress(format!(
                "primary address {pad} is out of range 0..={MAX_BUS_ADDRESS}"
            )));
        }
        if let Some(sad) = sad {
            if sad > MAX_BUS_ADDRESS {
                return Err(InstrumentError::InvalidAddress(format!(
                    "secondary address {sad} is out of range 0..={MAX_BUS_ADDRESS}"
                )));
            }
        }
        Ok(Self { board, pad, sad })
    }
}

/// Network (LAN/LXI) instrument reached through the resource manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanAddress {
    pub board: u32,
    pub host: String,
    pub device_name: Option<String>,
}

impl LanAddress {
    pub fn new(board: u32, host: impl Into<String>, device_name: Option<String>) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(InstrumentError::InvalidAddress(
                "LAN host must not be empty".to_string(),
            ));
        }
        if host.contains("::") {
            return Err(InstrumentError::InvalidAddress(format!(
                "LAN host {host:?} must not contain '::'"
            )));
        }
        let device_name = device_name.filter(|name| !name.trim().is_empty());
        Ok(Self {
            board,
            host,
            device_name,
        })
    }
}

/// Where the instrument lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Bus(BusAddress),
    Lan(LanAddress),
}

impl Address {
    /// The resource-manager descriptor for this address.
    pub fn resource_string(&self) -> String {
        match self {
            Address::Bus(BusAddress {
                board,
                pad,
                sad: Some(sad),
            }) => format!("GPIB{board}::{pad}::{sad}::INSTR"),
            Address::Bus(BusAddress {
                board,
                pad,
                sad: None,
            }) => format!("GPIB{board}::{pad}::INSTR"),
            Address::Lan(LanAddress {
                board,
                host,
                device_name: Some(name),
            }) => format!("TCPIP{board}::{host}::{name}::INSTR"),
            Address::Lan(LanAddress {
                board,
                host,
                device_name: None,
            }) => format!("TCPIP{board}::{host}::INSTR"),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_string())
    }
}

impl From<BusAddress> for Address {
    fn from(addr: BusAddress) -> Self {
        Address::Bus(addr)
    }
}

impl From<LanAddress> for Address {
    fn from(addr: LanAddress) -> Self {
        Address::Lan(addr)
    }
}
