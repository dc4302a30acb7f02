use crate::error::Result;
use crate::traits::Instrument;

/// Identification query sent to bus instruments.
pub const IDN_QUERY: &[u8] = b"*IDN?";

/// Longest identification string kept.
pub const IDN_MAX_LEN: usize = 1023;

/// One instrument found while listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentInfo {
    /// Resource string of the instrument.
    pub address: String,
    /// Reply to the identification query, when the instrument answered.
    pub identity: Option<String>,
}

/// Send `query` and return the reply as trimmed text.
pub fn identify<I: Instrument + ?Sized>(instrument: &mut I, query: &[u8]) -> Result<String> {
    instrument.write(query)?;
    let reply = instrument.read(IDN_MAX_LEN)?;
    Ok(String::from_utf8_lossy(&reply).trim_end().to_string())
}
