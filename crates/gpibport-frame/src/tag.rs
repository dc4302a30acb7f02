//! Command tags.
//!
//! The first byte of every frame selects the operation. Tags 0-3 are defined;
//! anything else is carried through as [`CommandTag::Unknown`] so the caller
//! decides what an unrecognised command means.

/// Write the frame body to the instrument.
pub const WRITE_TO_INSTRUMENT: u8 = 0;

/// Read from the instrument (request), or bytes read from it (response).
pub const READ_FROM_INSTRUMENT: u8 = 1;

/// Advisory diagnostic text.
pub const DEBUG_MESSAGE: u8 = 2;

/// Close the instrument and end the session.
pub const SHUTDOWN: u8 = 3;

/// Decoded form of a frame's tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTag {
    WriteToInstrument,
    ReadFromInstrument,
    DebugMessage,
    Shutdown,
    Unknown(u8),
}

impl CommandTag {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::WriteToInstrument => WRITE_TO_INSTRUMENT,
            Self::ReadFromInstrument => READ_FROM_INSTRUMENT,
            Self::DebugMessage => DEBUG_MESSAGE,
            Self::Shutdown => SHUTDOWN,
            Self::Unknown(tag) => tag,
        }
    }

    /// Human-readable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::WriteToInstrument => "WRITE",
            Self::ReadFromInstrument => "READ",
            Self::DebugMessage => "DEBUG",
            Self::Shutdown => "SHUTDOWN",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for CommandTag {
    fn from(tag: u8) -> Self {
        match tag {
            WRITE_TO_INSTRUMENT => Self::WriteToInstrument,
            READ_FROM_INSTRUMENT => Self::ReadFromInstrument,
            DEBUG_MESSAGE => Self::DebugMessage,
            SHUTDOWN => Self::Shutdown,
            other => Self::Unknown(other),
        }
    }
}

impl From<CommandTag> for u8 {
    fn from(tag: CommandTag) -> Self {
        tag.as_u8()
    }
}
