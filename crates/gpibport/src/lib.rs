//! Bridge between a supervisory process and a GPIB-class instrument.
//!
//! The parent talks to the bridge over stdin/stdout using length-prefixed
//! command frames (or plain lines, interactively); the bridge drives the
//! instrument through an NI-488.2 or VISA driver.
//!
//! # Crate Structure
//!
//! - [`frame`]: length-prefixed framing and command tags
//! - [`instrument`]: instrument trait, addressing, and driver backends
//! - [`session`]: port and interactive dispatch loops, cancellation

/// Re-export frame types.
pub mod frame {
    pub use gpibport_frame::*;
}

/// Re-export instrument types.
pub mod instrument {
    pub use gpibport_instrument::*;
}

/// Re-export session types.
pub mod session {
    pub use gpibport_session::*;
}
