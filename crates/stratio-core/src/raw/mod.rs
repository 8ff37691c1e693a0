//! Raw stream capability contract.
//!
//! A raw stream is the unbuffered boundary under the stack: one `read` or
//! `write` call maps to at most one transfer against the underlying object,
//! partial progress is normal, and a non-blocking object reports inability
//! to progress as a value, never as an error.
//!
//! Design: capabilities are part of the contract (`readable`, `writable`,
//! `seekable`, `has_readall`) and are probed once by the buffered layer at
//! construction. Outcomes are tagged enums so that end-of-data, would-block,
//! and produced bytes cannot be confused.

mod memory;

pub use memory::MemoryStream;

use std::io::SeekFrom;

use crate::error::{StreamError, StreamResult};

/// Outcome of a single raw read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRead {
    /// Bytes were produced. Non-empty for any non-zero request.
    Data(Vec<u8>),
    /// The stream has no further data, ever.
    Eof,
    /// A non-blocking stream has no data right now; retry later.
    WouldBlock,
}

impl RawRead {
    /// Number of bytes carried by this outcome.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RawRead::Data(bytes) => bytes.len(),
            _ => 0,
        }
    }

    /// True when no bytes are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a single raw write request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawWrite {
    /// The stream accepted this many bytes from the front of the slice.
    /// Must be non-zero for a non-empty slice and never more than its length.
    Accepted(usize),
    /// A non-blocking stream accepted nothing; retry later.
    WouldBlock,
}

/// Contract implemented by unbuffered stream endpoints.
///
/// Every method defaults to the weakest honest answer so that one-sided
/// endpoints (a read-only source, a write-only sink) only implement the
/// side they have. `close` must be idempotent; the buffered layer calls it
/// exactly once but callers holding the raw directly may not.
pub trait RawStream {
    /// Read at most `max` bytes in one transfer.
    fn read(&mut self, max: usize) -> StreamResult<RawRead> {
        let _ = max;
        Err(StreamError::Unsupported("read"))
    }

    /// Read all remaining bytes in one call, if the endpoint can do better
    /// than a chunk loop. Implementations that provide this must also
    /// return `true` from [`RawStream::has_readall`].
    fn readall(&mut self) -> StreamResult<RawRead> {
        Err(StreamError::Unsupported("readall"))
    }

    /// Whether [`RawStream::readall`] is provided.
    fn has_readall(&self) -> bool {
        false
    }

    /// Write bytes from the front of `data` in one transfer.
    fn write(&mut self, data: &[u8]) -> StreamResult<RawWrite> {
        let _ = data;
        Err(StreamError::Unsupported("write"))
    }

    /// Reposition the stream, returning the new absolute offset.
    fn seek(&mut self, pos: SeekFrom) -> StreamResult<u64> {
        let _ = pos;
        Err(StreamError::Unsupported("seek"))
    }

    /// Current absolute offset.
    fn tell(&mut self) -> StreamResult<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// Resize to `size` bytes (current offset when `None`), returning the
    /// new size. The offset itself is left where it was.
    fn truncate(&mut self, size: Option<u64>) -> StreamResult<u64> {
        let _ = size;
        Err(StreamError::Unsupported("truncate"))
    }

    /// Push any endpoint-internal state to the device. No-op by default.
    fn flush(&mut self) -> StreamResult<()> {
        Ok(())
    }

    /// Release the endpoint. Further reads and writes fail with `Closed`.
    fn close(&mut self) -> StreamResult<()> {
        Ok(())
    }

    /// Underlying OS descriptor, when one exists.
    fn fileno(&self) -> Option<i32> {
        None
    }

    /// Whether the endpoint is an interactive terminal.
    fn isatty(&self) -> bool {
        false
    }

    fn readable(&self) -> bool;

    fn writable(&self) -> bool;

    fn seekable(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SinkOnly;

    impl RawStream for SinkOnly {
        fn write(&mut self, data: &[u8]) -> StreamResult<RawWrite> {
            Ok(RawWrite::Accepted(data.len()))
        }

        fn readable(&self) -> bool {
            false
        }

        fn writable(&self) -> bool {
            true
        }

        fn seekable(&self) -> bool {
            false
        }
    }

    #[test]
    fn one_sided_endpoint_refuses_the_other_side() {
        let mut sink = SinkOnly;
        assert!(matches!(
            sink.read(16),
            Err(StreamError::Unsupported("read"))
        ));
        assert!(matches!(sink.write(b"xy"), Ok(RawWrite::Accepted(2))));
        assert!(matches!(
            sink.seek(SeekFrom::Start(0)),
            Err(StreamError::Unsupported("seek"))
        ));
        assert!(!sink.has_readall());
    }

    #[test]
    fn raw_read_len_reports_payload_only() {
        assert_eq!(RawRead::Data(vec![1, 2, 3]).len(), 3);
        assert!(RawRead::Eof.is_empty());
        assert!(RawRead::WouldBlock.is_empty());
    }
}
