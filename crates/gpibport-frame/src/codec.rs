use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::tag::CommandTag;

/// Length prefix: 2 bytes, big-endian.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest frame (tag + body) a 2-byte prefix can describe.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Largest body that fits next to the tag byte.
pub const MAX_BODY_LEN: usize = MAX_FRAME_LEN - 1;

/// One command or response: a tag byte and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw tag byte as it appeared on the wire.
    pub tag: u8,
    /// Everything after the tag.
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(tag: impl Into<u8>, body: impl Into<Bytes>) -> Self {
        Self {
            tag: tag.into(),
            body: body.into(),
        }
    }

    /// The decoded command tag.
    pub fn command(&self) -> CommandTag {
        CommandTag::from(self.tag)
    }

    /// The value of the length prefix for this frame.
    pub fn frame_len(&self) -> usize {
        1 + self.body.len()
    }

    /// The total wire size of this frame (prefix + tag + body).
    pub fn wire_size(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.frame_len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬───────┬───────────────────┐
/// │ lenHi  │ lenLo  │ tag   │ body (len-1 bytes)│
/// └────────┴────────┴───────┴───────────────────┘
/// ```
pub fn encode_frame(tag: u8, body: &[u8], dst: &mut BytesMut) -> Result<()> {
    let frame_len = 1 + body.len();
    if frame_len > MAX_FRAME_LEN {
        return Err(FrameError::FrameTooLarge {
            size: frame_len,
            max: MAX_FRAME_LEN,
        });
    }
    dst.reserve(LENGTH_PREFIX_SIZE + frame_len);
    dst.put_u16(frame_len as u16);
    dst.put_u8(tag);
    dst.put_slice(body);
    Ok(())
}

pub(crate) fn check_frame_len(frame_len: usize, max_frame_len: usize) -> Result<()> {
    if frame_len == 0 {
        return Err(FrameError::EmptyFrame);
    }
    if frame_len > max_frame_len {
        return Err(FrameError::FrameTooLarge {
            size: frame_len,
            max: max_frame_len,
        });
    }
    Ok(())
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum frame size (tag + body) in bytes. Default and ceiling: 65535.
    pub max_frame_len: usize,
}

impl FrameConfig {
    /// Largest body that fits in a frame under this configuration.
    pub fn max_body_len(&self) -> usize {
        self.effective_max_frame_len().saturating_sub(1)
    }

    pub(crate) fn effective_max_frame_len(&self) -> usize {
        self.max_frame_len.min(MAX_FRAME_LEN)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::reader::FrameReader;
    use crate::tag::{READ_FROM_INSTRUMENT, SHUTDOWN, WRITE_TO_INSTRUMENT};

    fn decode(buf: BytesMut) -> Frame {
        FrameReader::new(Cursor::new(buf.to_vec())).read_frame().unwrap()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        encode_frame(WRITE_TO_INSTRUMENT, b"HELLO", &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            &[0x00, 0x06, 0x00, 0x48, 0x45, 0x4C, 0x4C, 0x4F]
        );

        let frame = decode(buf);
        assert_eq!(frame.command(), CommandTag::WriteToInstrument);
        assert_eq!(frame.body.as_ref(), b"HELLO");
    }

    #[test]
    fn test_read_response_wire_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(READ_FROM_INSTRUMENT, b"DATA", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x00, 0x05, 0x01, 0x44, 0x41, 0x54, 0x41]);
    }

    #[test]
    fn test_empty_body() {
        let mut buf = BytesMut::new();
        encode_frame(SHUTDOWN, b"", &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x00, 0x01, 0x03]);

        let frame = decode(buf);
        assert_eq!(frame.command(), CommandTag::Shutdown);
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_largest_body_roundtrips() {
        let body = vec![0x5A; MAX_BODY_LEN];
        let mut buf = BytesMut::new();
        encode_frame(0xFF, &body, &mut buf).unwrap();
        assert_eq!(&buf[..2], &[0xFF, 0xFF]);

        let frame = decode(buf);
        assert_eq!(frame.tag, 0xFF);
        assert_eq!(frame.body.len(), MAX_BODY_LEN);
    }

    #[test]
    fn test_encode_rejects_oversized_body() {
        let body = vec![0u8; MAX_BODY_LEN + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(WRITE_TO_INSTRUMENT, &body, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::FrameTooLarge {
                size: 65536,
                max: MAX_FRAME_LEN
            }
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_frame_len_limits() {
        assert!(matches!(
            check_frame_len(0, MAX_FRAME_LEN),
            Err(FrameError::EmptyFrame)
        ));
        assert!(matches!(
            check_frame_len(11, 8),
            Err(FrameError::FrameTooLarge { size: 11, max: 8 })
        ));
        assert!(check_frame_len(1, MAX_FRAME_LEN).is_ok());
        assert!(check_frame_len(MAX_FRAME_LEN, MAX_FRAME_LEN).is_ok());
    }

    #[test]
    fn test_frame_sizes() {
        let frame = Frame::new(CommandTag::ReadFromInstrument, Bytes::from_static(b"test"));
        assert_eq!(frame.frame_len(), 5);
        assert_eq!(frame.wire_size(), LENGTH_PREFIX_SIZE + 5);
    }

    #[test]
    fn test_config_never_exceeds_wire_limit() {
        let cfg = FrameConfig {
            max_frame_len: 1 << 20,
        };
        assert_eq!(cfg.max_body_len(), MAX_BODY_LEN);
        assert_eq!(FrameConfig { max_frame_len: 16 }.max_body_len(), 15);
    }
}
