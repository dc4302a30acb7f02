//! Session layer of the bridge.
//!
//! A [`Session`] owns the open instrument, reads commands from its input
//! (frames in port mode, lines in interactive mode), drives the instrument
//! and answers through a single [`ResponseSink`]. The instrument is always
//! closed before [`Session::run`] returns.

pub mod cancel;
pub mod device;
pub mod error;
pub mod interactive;
pub mod port;
pub mod session;
pub mod sink;

#[cfg(test)]
mod testing;

pub use cancel::{spawn_watcher, DEFAULT_CANCEL_GRACE};
pub use device::Device;
pub use error::{Outcome, Result, SessionError};
pub use session::{Mode, Session, SessionConfig, DEFAULT_MAX_LINE_LEN, DEFAULT_READ_LEN};
pub use sink::{ReceiveStrategy, ResponseSink};
