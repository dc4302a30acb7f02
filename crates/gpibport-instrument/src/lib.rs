//! Instrument adapter interface and backends.
//!
//! The bridge only ever talks to an instrument through [`Instrument`]. Two
//! driver backends implement it, plus a loopback used for testing:
//! - [`ni488`]: NI-488.2 bus driver, addressed by board + primary/secondary
//! - [`visa`]: VISA resource manager, addressed by resource string
//! - [`loopback`]: in-process echo instrument
//!
//! The driver backends link their vendor library only when the matching
//! cargo feature is enabled.

pub mod address;
pub mod backend;
pub mod discovery;
pub mod error;
pub mod loopback;
pub mod ni488;
pub mod traits;
pub mod visa;

pub use address::{Address, BusAddress, LanAddress, MAX_BUS_ADDRESS};
pub use backend::{list_instruments, open_instrument, Backend, Target, DEFAULT_TIMEOUT};
pub use discovery::InstrumentInfo;
pub use error::{InstrumentError, Result};
pub use loopback::LoopbackInstrument;
pub use traits::{AbortHandle, Instrument};
