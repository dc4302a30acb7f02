//! Length-prefixed command framing for the gpibport stdio protocol.
//!
//! Every frame on the wire is:
//! - A 2-byte big-endian length counting everything after the prefix
//! - A 1-byte command tag
//! - The body (length - 1 bytes)
//!
//! Readers only ever hand out complete frames; a stream that ends inside a
//! frame is reported as an error, never as a short frame.

pub mod codec;
pub mod error;
pub mod io;
pub mod reader;
pub mod tag;
pub mod writer;

pub use codec::{encode_frame, Frame, FrameConfig, LENGTH_PREFIX_SIZE, MAX_BODY_LEN, MAX_FRAME_LEN};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use tag::{CommandTag, DEBUG_MESSAGE, READ_FROM_INSTRUMENT, SHUTDOWN, WRITE_TO_INSTRUMENT};
pub use writer::FrameWriter;
