use std::fmt;
use std::time::Duration;

use crate::address::{Address, BusAddress};
use crate::discovery::InstrumentInfo;
use crate::error::{InstrumentError, Result};
use crate::loopback::{LoopbackInstrument, LOOPBACK_IDENTITY};
use crate::ni488::Ni488Instrument;
use crate::traits::Instrument;
use crate::visa::VisaInstrument;

/// Default driver timeout for reads and writes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which driver talks to the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// NI-488.2 bus driver (board + primary/secondary address).
    Ni488,
    /// VISA resource manager (resource strings, GPIB or LAN).
    Visa,
    /// In-process echo instrument.
    Loopback,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Ni488 => "ni488",
            Backend::Visa => "visa",
            Backend::Loopback => "loopback",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A backend plus the address it should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub backend: Backend,
    pub address: Address,
}

impl Target {
    /// Pair a backend with an address, rejecting combinations the backend
    /// cannot reach.
    pub fn new(backend: Backend, address: Address) -> Result<Self> {
        if backend == Backend::Ni488 && matches!(address, Address::Lan(_)) {
            return Err(InstrumentError::InvalidAddress(format!(
                "{address} is a LAN resource; the ni488 backend only reaches bus addresses"
            )));
        }
        Ok(Self { backend, address })
    }
}

impl Default for Target {
    /// Primary address 1 on board 0 of the bus driver.
    fn default() -> Self {
        Self {
            backend: Backend::Ni488,
            address: Address::Bus(BusAddress {
                board: 0,
                pad: 1,
                sad: None,
            }),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.backend, self.address)
    }
}

/// Open the target's instrument and issue a device clear.
///
/// If the clear fails the instrument is closed before the error is returned.
pub fn open_instrument(target: &Target, timeout: Duration) -> Result<Box<dyn Instrument>> {
    let mut instrument: Box<dyn Instrument> = match (&target.backend, &target.address) {
        (Backend::Ni488, Address::Bus(bus)) => Box::new(Ni488Instrument::open(bus, timeout)?),
        (Backend::Ni488, Address::Lan(_)) => {
            return Err(InstrumentError::InvalidAddress(format!(
                "{} cannot be opened by the ni488 backend",
                target.address
            )))
        }
        (Backend::Visa, address) => {
            Box::new(VisaInstrument::open(&address.resource_string(), timeout)?)
        }
        (Backend::Loopback, address) => {
            Box::new(LoopbackInstrument::new(address.resource_string(), timeout))
        }
    };

    if let Err(err) = instrument.clear() {
        instrument.close();
        return Err(err);
    }

    tracing::info!(instrument = %instrument.describe(), "instrument ready");
    Ok(instrument)
}

/// List the instruments reachable through `backend`.
///
/// `board` selects the GPIB board for the bus backend; the resource manager
/// searches every interface.
pub fn list_instruments(
    backend: Backend,
    board: u32,
    timeout: Duration,
) -> Result<Vec<InstrumentInfo>> {
    match backend {
        Backend::Ni488 => Ni488Instrument::list(board, timeout),
        Backend::Visa => VisaInstrument::list(timeout),
        Backend::Loopback => Ok(vec![InstrumentInfo {
            address: format!("LOOPBACK{board}::INSTR"),
            identity: Some(LOOPBACK_IDENTITY.to_string()),
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::LanAddress;

    fn bus() -> Address {
        Address::Bus(BusAddress::new(0, 1, None).unwrap())
    }

    fn lan() -> Address {
        Address::Lan(LanAddress::new(0, "10.0.0.5", Some("inst0".to_string())).unwrap())
    }

    #[test]
    fn ni488_rejects_lan_targets() {
        assert!(Target::new(Backend::Ni488, lan()).is_err());
        assert!(Target::new(Backend::Ni488, bus()).is_ok());
        assert!(Target::new(Backend::Visa, lan()).is_ok());
    }

    #[test]
    fn loopback_opens_and_echoes() {
        let target = Target::new(Backend::Loopback, bus()).unwrap();
        let mut inst = open_instrument(&target, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(inst.describe(), "loopback GPIB0::1::INSTR");

        inst.write(b"*IDN?").unwrap();
        assert_eq!(inst.read(64).unwrap().as_ref(), b"*IDN?");
        inst.close();
    }

    #[test]
    fn loopback_lists_itself() {
        let found = list_instruments(Backend::Loopback, 0, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, "LOOPBACK0::INSTR");
        assert_eq!(found[0].identity.as_deref(), Some(LOOPBACK_IDENTITY));
    }

    #[test]
    fn display_names() {
        let target = Target::new(Backend::Visa, lan()).unwrap();
        assert_eq!(target.to_string(), "visa TCPIP0::10.0.0.5::inst0::INSTR");
    }

    #[cfg(not(any(feature = "ni488", feature = "visa")))]
    #[test]
    fn driver_backends_report_unavailable_without_features() {
        for backend in [Backend::Ni488, Backend::Visa] {
            let target = Target::new(backend, bus()).unwrap();
            let err = open_instrument(&target, DEFAULT_TIMEOUT).err();
            assert!(matches!(
                err,
                Some(InstrumentError::BackendUnavailable { .. })
            ));
        }
    }
}
