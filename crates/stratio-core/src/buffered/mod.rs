//! Buffered binary layers over raw streams.
//!
//! Three variants share one engine: [`BufferedReader`] amortizes small reads
//! with read-ahead, [`BufferedWriter`] coalesces small writes and flushes
//! eagerly past capacity, [`BufferedRandom`] drives both sides of a single
//! seekable raw endpoint. Each variant is a plain struct over a shared
//! [`BufferedCore`] plus per-side state; there is no inheritance lattice.
//!
//! Locking: every public operation takes `&self` and holds the instance
//! mutex for its whole duration, nested raw calls included. The lock is not
//! reentrant, so implementations never call back into the public surface.

mod random;
mod reader;
mod writer;

pub use random::BufferedRandom;
pub use reader::BufferedReader;
pub use writer::BufferedWriter;

use std::io::SeekFrom;

use crate::error::{StreamError, StreamResult};
use crate::raw::RawStream;

/// Default capacity of the read-ahead and write-coalescing buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Outcome of a buffered read request.
///
/// Partial progress before end-of-data or a stall is still `Bytes`; `Eof`
/// and `WouldBlock` are only returned when nothing at all was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes were produced. Empty only for a zero-length request.
    Bytes(Vec<u8>),
    /// End of stream, nothing produced.
    Eof,
    /// Non-blocking raw stream had nothing, nothing produced.
    WouldBlock,
}

impl ReadOutcome {
    /// Number of bytes carried by this outcome.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ReadOutcome::Bytes(bytes) => bytes.len(),
            _ => 0,
        }
    }

    /// True when no bytes are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True only for the end-of-stream outcome.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, ReadOutcome::Eof)
    }
}

/// Byte-stream surface consumed by the text layer and exposed by all three
/// buffered variants.
///
/// Defaults answer for the side an implementation does not have, so a
/// read-only layer reports `Unsupported` for writes without writing any
/// code for it. Capability queries (`readable`, `writable`, `seekable`,
/// `has_read1`) are stable for the lifetime of the instance; callers may
/// probe them once and cache the answer.
pub trait ByteStream {
    /// Read exactly `n` bytes unless end-of-data or a stall intervenes;
    /// `None` reads to end-of-data.
    fn read(&self, n: Option<usize>) -> StreamResult<ReadOutcome> {
        let _ = n;
        Err(StreamError::Unsupported("read"))
    }

    /// Read up to `n` bytes with at most one raw transfer.
    fn read1(&self, n: usize) -> StreamResult<ReadOutcome> {
        let _ = n;
        Err(StreamError::Unsupported("read1"))
    }

    /// Whether [`ByteStream::read1`] is provided.
    fn has_read1(&self) -> bool {
        false
    }

    /// Look at upcoming bytes without consuming them, topping the buffer up
    /// with at most one raw transfer. May return more or fewer than `n`.
    fn peek(&self, n: usize) -> StreamResult<Vec<u8>> {
        let _ = n;
        Err(StreamError::Unsupported("peek"))
    }

    /// Accept all of `data`, coalescing into the write buffer. Returns the
    /// number accepted (always `data.len()` on success); a stall surfaces
    /// as [`StreamError::WouldBlock`] carrying the partial count.
    fn write(&self, data: &[u8]) -> StreamResult<usize> {
        let _ = data;
        Err(StreamError::Unsupported("write"))
    }

    /// Push buffered writes down to the raw stream.
    fn flush(&self) -> StreamResult<()>;

    /// Flush, then close the raw stream. Idempotent.
    fn close(&self) -> StreamResult<()>;

    /// True once `close` has completed (or the raw stream was detached).
    fn is_closed(&self) -> bool;

    /// Reposition, translating buffered state so the logical position is
    /// exact. Returns the new absolute byte offset.
    fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        let _ = pos;
        Err(StreamError::Unsupported("seek"))
    }

    /// Logical absolute byte offset, adjusted for buffered state.
    fn tell(&self) -> StreamResult<u64> {
        Err(StreamError::Unsupported("seek"))
    }

    /// Resize the raw stream after flushing pending writes.
    fn truncate(&self, size: Option<u64>) -> StreamResult<u64> {
        let _ = size;
        Err(StreamError::Unsupported("truncate"))
    }

    fn readable(&self) -> bool {
        false
    }

    fn writable(&self) -> bool {
        false
    }

    fn seekable(&self) -> bool {
        false
    }

    /// OS descriptor of the raw stream, when it has one.
    fn fileno(&self) -> StreamResult<i32> {
        Err(StreamError::Unsupported("fileno"))
    }

    /// Whether the raw stream is an interactive terminal.
    fn isatty(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Shared engine state
// ---------------------------------------------------------------------------

/// State common to all buffered variants: the raw endpoint and capabilities
/// probed once at construction.
#[derive(Debug)]
pub(crate) struct BufferedCore<R: RawStream> {
    raw: Option<R>,
    buffer_size: usize,
    has_readall: bool,
    seekable: bool,
    closed: bool,
}

impl<R: RawStream> BufferedCore<R> {
    pub(crate) fn new(raw: R, buffer_size: usize) -> Self {
        let has_readall = raw.has_readall();
        let seekable = raw.seekable();
        Self {
            raw: Some(raw),
            // A zero capacity cannot amortize anything; clamp like any
            // other degenerate buffer request.
            buffer_size: buffer_size.max(1),
            has_readall,
            seekable,
            closed: false,
        }
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub(crate) fn has_readall(&self) -> bool {
        self.has_readall
    }

    pub(crate) fn is_seekable(&self) -> bool {
        self.seekable
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed || self.raw.is_none()
    }

    pub(crate) fn ensure_open(&self) -> StreamResult<()> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        Ok(())
    }

    pub(crate) fn raw(&mut self) -> StreamResult<&mut R> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.raw.as_mut().ok_or(StreamError::Closed)
    }

    /// Close the raw endpoint and latch the closed state. Safe to call more
    /// than once; only the first call reaches the raw stream.
    pub(crate) fn close_raw(&mut self) -> StreamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.raw.as_mut() {
            Some(raw) => raw.close(),
            None => Ok(()),
        }
    }

    /// Hand the raw endpoint back and latch the closed state.
    pub(crate) fn take_raw(&mut self) -> StreamResult<R> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        self.closed = true;
        self.raw.take().ok_or(StreamError::Closed)
    }

    pub(crate) fn require_seekable(&self) -> StreamResult<()> {
        if !self.seekable {
            return Err(StreamError::Unsupported("seek"));
        }
        Ok(())
    }

    pub(crate) fn fileno(&self) -> StreamResult<i32> {
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        match self.raw.as_ref().and_then(|raw| raw.fileno()) {
            Some(fd) => Ok(fd),
            None => Err(StreamError::Unsupported("fileno")),
        }
    }

    pub(crate) fn isatty(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.isatty())
    }
}

/// Read-ahead buffer: bytes fetched from the raw stream but not yet handed
/// to the caller. `pos` is the consumption cursor; `pos <= buf.len()`.
#[derive(Debug, Default)]
pub(crate) struct ReaderState {
    buf: Vec<u8>,
    pos: usize,
}

impl ReaderState {
    /// Bytes fetched but not yet consumed.
    pub(crate) fn unconsumed(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn rest(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub(crate) fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }

    /// Consume up to `n` buffered bytes.
    pub(crate) fn take(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.unconsumed());
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        out
    }

    /// Consume everything, leaving the buffer empty.
    pub(crate) fn take_all(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.buf);
        out.drain(..self.pos);
        self.pos = 0;
        out
    }

    /// Replace the buffer wholesale with freshly fetched bytes.
    pub(crate) fn refill(&mut self, data: Vec<u8>) {
        self.buf = data;
        self.pos = 0;
    }

    /// Append freshly fetched bytes behind the unconsumed tail, compacting
    /// the consumed prefix away first.
    pub(crate) fn extend(&mut self, data: &[u8]) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(data);
    }
}

/// Write-coalescing buffer: bytes accepted from callers but not yet pushed
/// to the raw stream. Drained from the front as the raw stream accepts.
#[derive(Debug, Default)]
pub(crate) struct WriterState {
    buf: Vec<u8>,
}

impl WriterState {
    pub(crate) fn pending(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Drop the accepted prefix after a successful raw write.
    pub(crate) fn consume_front(&mut self, n: usize) {
        self.buf.drain(..n);
    }

    /// Cut back to `capacity` bytes, returning how many were discarded.
    pub(crate) fn trim_to(&mut self, capacity: usize) -> usize {
        let overage = self.buf.len().saturating_sub(capacity);
        self.buf.truncate(capacity);
        overage
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::MemoryStream;

    #[test]
    fn core_clamps_degenerate_capacity() {
        let core = BufferedCore::new(MemoryStream::new(), 0);
        assert_eq!(core.buffer_size(), 1);
    }

    #[test]
    fn reader_state_take_and_extend_keep_cursor_consistent() {
        let mut st = ReaderState::default();
        st.refill(b"abcdef".to_vec());
        assert_eq!(st.take(2), b"ab");
        assert_eq!(st.unconsumed(), 4);
        st.extend(b"gh");
        assert_eq!(st.rest(), b"cdefgh");
        assert_eq!(st.take_all(), b"cdefgh");
        assert_eq!(st.unconsumed(), 0);
    }

    #[test]
    fn writer_state_trims_overage_from_the_back() {
        let mut st = WriterState::default();
        st.append(b"0123456789");
        st.consume_front(3);
        assert_eq!(st.pending(), 7);
        assert_eq!(st.trim_to(4), 3);
        assert_eq!(st.as_slice(), b"3456");
    }

    #[test]
    fn take_raw_latches_closed() {
        let mut core = BufferedCore::new(MemoryStream::new(), 16);
        let _raw = core.take_raw().unwrap();
        assert!(core.is_closed());
        assert!(matches!(core.raw(), Err(StreamError::Closed)));
        assert!(core.close_raw().is_ok());
    }
}
