//! Byte-exact stream I/O.
//!
//! Pipes may deliver fewer bytes per call than requested. These helpers loop
//! until the requested count is satisfied or the stream stops making progress.

use std::io::{self, ErrorKind, Read, Write};

/// Fill `buf` from `reader`, retrying partial and interrupted reads.
///
/// Returns the number of bytes read. A value smaller than `buf.len()` means
/// the stream reached end-of-file first.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0usize;
    while got < buf.len() {
        match reader.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(got)
}

/// Write all of `buf` to `writer`, retrying partial and interrupted writes.
///
/// A write that accepts zero bytes is reported as `ErrorKind::WriteZero`.
pub fn write_full<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> io::Result<()> {
    let mut wrote = 0usize;
    while wrote < buf.len() {
        match writer.write(&buf[wrote..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("stream accepted {wrote} of {} bytes", buf.len()),
                ))
            }
            Ok(n) => wrote += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct Trickle {
        bytes: Vec<u8>,
        pos: usize,
        interrupt_next: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct HalfWriter {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for HalfWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let room = self.limit - self.data.len();
            let n = buf.len().min(room).min(2);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn read_full_collects_trickled_bytes() {
        let mut reader = Trickle {
            bytes: b"abcdef".to_vec(),
            pos: 0,
            interrupt_next: true,
        };
        let mut buf = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(&buf, b"abcdef");
    }

    #[test]
    fn read_full_reports_short_count_at_eof() {
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 3);
    }

    #[test]
    fn read_full_of_empty_buffer_reads_nothing() {
        let mut reader = Cursor::new(vec![1u8]);
        assert_eq!(read_full(&mut reader, &mut []).unwrap(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn write_full_loops_over_partial_writes() {
        let mut writer = HalfWriter {
            data: Vec::new(),
            limit: 64,
        };
        write_full(&mut writer, b"partial writes").unwrap();
        assert_eq!(writer.data, b"partial writes");
    }

    #[test]
    fn write_full_fails_when_stream_stalls() {
        let mut writer = HalfWriter {
            data: Vec::new(),
            limit: 3,
        };
        let err = write_full(&mut writer, b"too long").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }
}
