//! In-memory raw stream over an owned byte vector.
//!
//! Reference seekable duplex endpoint: every capability of the raw contract
//! is present, which makes it the fixture of choice for exercising the
//! buffered and text layers without touching the OS.

use std::io::SeekFrom;

use crate::error::{StreamError, StreamResult};
use crate::raw::{RawRead, RawStream, RawWrite};

/// Growable in-memory stream. Reads and writes share one offset; writing
/// past the end zero-fills the gap first.
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: u64,
    closed: bool,
}

impl MemoryStream {
    /// Empty stream positioned at offset zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream over existing contents, positioned at offset zero.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            closed: false,
        }
    }

    /// Consume the stream and return its contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Current contents, regardless of offset.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total length of the contents in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the contents are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn ensure_open(&self) -> StreamResult<()> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        Ok(())
    }
}

impl RawStream for MemoryStream {
    fn read(&mut self, max: usize) -> StreamResult<RawRead> {
        self.ensure_open()?;
        if max == 0 {
            return Ok(RawRead::Data(Vec::new()));
        }
        let len = self.data.len() as u64;
        if self.pos >= len {
            return Ok(RawRead::Eof);
        }
        let start = self.pos as usize;
        let end = start.saturating_add(max).min(self.data.len());
        let out = self.data[start..end].to_vec();
        self.pos = end as u64;
        Ok(RawRead::Data(out))
    }

    fn readall(&mut self) -> StreamResult<RawRead> {
        self.ensure_open()?;
        let len = self.data.len() as u64;
        if self.pos >= len {
            return Ok(RawRead::Eof);
        }
        let start = self.pos as usize;
        let out = self.data[start..].to_vec();
        self.pos = len;
        Ok(RawRead::Data(out))
    }

    fn has_readall(&self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) -> StreamResult<RawWrite> {
        self.ensure_open()?;
        let start = self.pos as usize;
        if start > self.data.len() {
            // Seek past the end followed by a write zero-fills the gap.
            self.data.resize(start, 0);
        }
        let overlap = data.len().min(self.data.len() - start);
        self.data[start..start + overlap].copy_from_slice(&data[..overlap]);
        self.data.extend_from_slice(&data[overlap..]);
        self.pos += data.len() as u64;
        Ok(RawWrite::Accepted(data.len()))
    }

    fn seek(&mut self, pos: SeekFrom) -> StreamResult<u64> {
        self.ensure_open()?;
        let next = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => (self.data.len() as u64).checked_add_signed(delta),
        };
        match next {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative offset",
            ))),
        }
    }

    fn tell(&mut self) -> StreamResult<u64> {
        self.ensure_open()?;
        Ok(self.pos)
    }

    fn truncate(&mut self, size: Option<u64>) -> StreamResult<u64> {
        self.ensure_open()?;
        let size = size.unwrap_or(self.pos);
        if size < self.data.len() as u64 {
            self.data.truncate(size as usize);
        }
        Ok(size)
    }

    fn close(&mut self) -> StreamResult<()> {
        self.closed = true;
        Ok(())
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        true
    }

    fn seekable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_share_one_offset() {
        let mut m = MemoryStream::new();
        assert!(matches!(m.write(b"hello"), Ok(RawWrite::Accepted(5))));
        assert_eq!(m.tell().unwrap(), 5);
        assert!(matches!(m.read(4), Ok(RawRead::Eof)));

        m.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(m.read(4).unwrap(), RawRead::Data(b"hell".to_vec()));
        assert_eq!(m.read(4).unwrap(), RawRead::Data(b"o".to_vec()));
        assert!(matches!(m.read(4), Ok(RawRead::Eof)));
    }

    #[test]
    fn write_past_end_zero_fills() {
        let mut m = MemoryStream::from_bytes(b"ab".to_vec());
        m.seek(SeekFrom::Start(5)).unwrap();
        m.write(b"z").unwrap();
        assert_eq!(m.as_bytes(), b"ab\0\0\0z");
    }

    #[test]
    fn overwrite_in_the_middle_extends_if_needed() {
        let mut m = MemoryStream::from_bytes(b"abcdef".to_vec());
        m.seek(SeekFrom::Start(4)).unwrap();
        m.write(b"XYZ").unwrap();
        assert_eq!(m.as_bytes(), b"abcdXYZ");
        assert_eq!(m.tell().unwrap(), 7);
    }

    #[test]
    fn readall_drains_from_current_offset() {
        let mut m = MemoryStream::from_bytes(b"abcdef".to_vec());
        m.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(m.readall().unwrap(), RawRead::Data(b"cdef".to_vec()));
        assert!(matches!(m.readall(), Ok(RawRead::Eof)));
    }

    #[test]
    fn truncate_defaults_to_current_offset() {
        let mut m = MemoryStream::from_bytes(b"abcdef".to_vec());
        m.seek(SeekFrom::Start(3)).unwrap();
        assert_eq!(m.truncate(None).unwrap(), 3);
        assert_eq!(m.as_bytes(), b"abc");
        // Growing via truncate is a no-op; the offset is untouched.
        assert_eq!(m.truncate(Some(10)).unwrap(), 10);
        assert_eq!(m.as_bytes(), b"abc");
        assert_eq!(m.tell().unwrap(), 3);
    }

    #[test]
    fn negative_seek_is_rejected() {
        let mut m = MemoryStream::from_bytes(b"abc".to_vec());
        assert!(matches!(
            m.seek(SeekFrom::Current(-1)),
            Err(StreamError::Io(_))
        ));
        // A failed seek leaves the offset alone.
        assert_eq!(m.tell().unwrap(), 0);
    }

    #[test]
    fn closed_stream_rejects_io_but_close_is_idempotent() {
        let mut m = MemoryStream::from_bytes(b"abc".to_vec());
        m.close().unwrap();
        m.close().unwrap();
        assert!(matches!(m.read(1), Err(StreamError::Closed)));
        assert!(matches!(m.write(b"x"), Err(StreamError::Closed)));
        assert!(matches!(m.tell(), Err(StreamError::Closed)));
    }
}
