//! Buffered duplex layer over one seekable raw endpoint.
//!
//! Read-ahead and write-coalescing each assume they own the raw offset, so
//! the two sides are sequenced: switching to writing first seeks the raw
//! back over the unconsumed read-ahead, and switching to reading first
//! drains pending writes. One lock covers both sides; there is no state in
//! which both buffers hold bytes at once.

use std::io::SeekFrom;

use parking_lot::Mutex;

use crate::buffered::reader::{peek_some, read_one_shot, read_some, tell_read};
use crate::buffered::writer::{flush_pending, tell_write, write_coalesced};
use crate::buffered::{BufferedCore, ByteStream, DEFAULT_BUFFER_SIZE, ReadOutcome, ReaderState, WriterState};
use crate::error::{StreamError, StreamResult};
use crate::raw::RawStream;

struct RandomInner<R: RawStream> {
    core: BufferedCore<R>,
    read: ReaderState,
    write: WriterState,
}

impl<R: RawStream> RandomInner<R> {
    /// Seek the raw offset back over bytes fetched but never consumed, so
    /// the raw position equals the logical read position.
    fn unwind_read_ahead(&mut self) -> StreamResult<()> {
        let unconsumed = self.read.unconsumed();
        if unconsumed > 0 {
            self.core
                .raw()?
                .seek(SeekFrom::Current(-(unconsumed as i64)))?;
            self.read.reset();
        }
        Ok(())
    }
}

/// Buffered read/write layer over a single seekable raw stream.
///
/// The raw endpoint must be readable, writable, and seekable. Pending
/// writes make `tell` report the write-side position; otherwise the
/// read-side position (raw minus read-ahead) is reported.
pub struct BufferedRandom<R: RawStream> {
    inner: Mutex<RandomInner<R>>,
}

impl<R: RawStream> BufferedRandom<R> {
    /// Wrap `raw` with the default capacity.
    pub fn new(raw: R) -> StreamResult<Self> {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, raw)
    }

    /// Wrap `raw` with an explicit capacity shared by both sides.
    pub fn with_capacity(capacity: usize, raw: R) -> StreamResult<Self> {
        if !raw.readable() {
            return Err(StreamError::Unsupported("stream is not readable"));
        }
        if !raw.writable() {
            return Err(StreamError::Unsupported("stream is not writable"));
        }
        if !raw.seekable() {
            return Err(StreamError::Unsupported("stream is not seekable"));
        }
        Ok(Self {
            inner: Mutex::new(RandomInner {
                core: BufferedCore::new(raw, capacity),
                read: ReaderState::default(),
                write: WriterState::default(),
            }),
        })
    }

    /// Read after draining pending writes. A write-side stall surfaces as
    /// [`StreamError::WouldBlock`] from here.
    pub fn read(&self, n: Option<usize>) -> StreamResult<ReadOutcome> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        read_some(&mut inner.core, &mut inner.read, n)
    }

    /// Single-transfer read after draining pending writes.
    pub fn read1(&self, n: usize) -> StreamResult<ReadOutcome> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        read_one_shot(&mut inner.core, &mut inner.read, n)
    }

    /// Look ahead after draining pending writes.
    pub fn peek(&self, n: usize) -> StreamResult<Vec<u8>> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        peek_some(&mut inner.core, &mut inner.read, n)
    }

    /// Write at the logical position, seeking the raw back over any
    /// unconsumed read-ahead first.
    pub fn write(&self, data: &[u8]) -> StreamResult<usize> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        inner.unwind_read_ahead()?;
        write_coalesced(&mut inner.core, &mut inner.write, data)
    }

    /// Reposition: drain writes, unwind the read-ahead, then seek the raw.
    pub fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.unwind_read_ahead()?;
        let new_pos = inner.core.raw()?.seek(pos)?;
        inner.read.reset();
        Ok(new_pos)
    }

    /// Logical byte offset; the write side wins while writes are pending.
    pub fn tell(&self) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        if inner.write.is_empty() {
            tell_read(&mut inner.core, &inner.read)
        } else {
            tell_write(&mut inner.core, &inner.write)
        }
    }

    /// Resize at `size` (the logical offset when `None`) after draining
    /// pending writes.
    pub fn truncate(&self, size: Option<u64>) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        let size = match size {
            Some(size) => size,
            None => {
                if inner.write.is_empty() {
                    tell_read(&mut inner.core, &inner.read)?
                } else {
                    tell_write(&mut inner.core, &inner.write)?
                }
            }
        };
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.core.raw()?.truncate(Some(size))
    }

    /// Drain pending writes down to the raw stream.
    pub fn flush(&self) -> StreamResult<()> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.core.raw()?.flush()
    }

    /// Flush, then close the raw stream even if the flush failed; the
    /// flush error wins when both fail. Idempotent.
    pub fn close(&self) -> StreamResult<()> {
        let inner = &mut *self.inner.lock();
        if inner.core.is_closed() {
            return Ok(());
        }
        let flushed = flush_pending(&mut inner.core, &mut inner.write);
        let closed = inner.core.close_raw();
        inner.read.reset();
        inner.write.clear();
        flushed.and(closed)
    }

    /// Flush, then hand back the raw stream, leaving this layer unusable.
    pub fn detach(mut self) -> StreamResult<R> {
        let inner = self.inner.get_mut();
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.read.reset();
        inner.core.take_raw()
    }

    /// Bytes fetched ahead but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.lock().read.unconsumed()
    }

    /// Bytes accepted but not yet pushed to the raw stream.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().write.pending()
    }

    /// Capacity shared by the read-ahead and write buffers.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().core.buffer_size()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().core.is_closed()
    }
}

impl<R: RawStream> ByteStream for BufferedRandom<R> {
    fn read(&self, n: Option<usize>) -> StreamResult<ReadOutcome> {
        BufferedRandom::read(self, n)
    }

    fn read1(&self, n: usize) -> StreamResult<ReadOutcome> {
        BufferedRandom::read1(self, n)
    }

    fn has_read1(&self) -> bool {
        true
    }

    fn peek(&self, n: usize) -> StreamResult<Vec<u8>> {
        BufferedRandom::peek(self, n)
    }

    fn write(&self, data: &[u8]) -> StreamResult<usize> {
        BufferedRandom::write(self, data)
    }

    fn flush(&self) -> StreamResult<()> {
        BufferedRandom::flush(self)
    }

    fn close(&self) -> StreamResult<()> {
        BufferedRandom::close(self)
    }

    fn is_closed(&self) -> bool {
        BufferedRandom::is_closed(self)
    }

    fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        BufferedRandom::seek(self, pos)
    }

    fn tell(&self) -> StreamResult<u64> {
        BufferedRandom::tell(self)
    }

    fn truncate(&self, size: Option<u64>) -> StreamResult<u64> {
        BufferedRandom::truncate(self, size)
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

    fn fileno(&self) -> StreamResult<i32> {
        self.inner.lock().core.fileno()
    }

    fn isatty(&self) -> bool {
        self.inner.lock().core.isatty()
    }
}

impl<R: RawStream> Drop for BufferedRandom<R> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.core.is_closed() {
            let _ = flush_pending(&mut inner.core, &mut inner.write);
        }
        let _ = inner.core.close_raw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::MemoryStream;

    #[test]
    fn write_after_read_lands_at_the_logical_position() {
        let raw = MemoryStream::from_bytes(b"abcdef".to_vec());
        let rw = BufferedRandom::with_capacity(4, raw).unwrap();
        assert_eq!(
            rw.read(Some(2)).unwrap(),
            ReadOutcome::Bytes(b"ab".to_vec())
        );
        // Read-ahead fetched 4 raw bytes; the write must land at offset 2.
        assert_eq!(rw.write(b"XY").unwrap(), 2);
        assert_eq!(rw.tell().unwrap(), 4);
        let raw = rw.detach().unwrap();
        assert_eq!(raw.as_bytes(), b"abXYef");
    }

    #[test]
    fn read_after_write_sees_the_flushed_bytes() {
        let raw = MemoryStream::new();
        let rw = BufferedRandom::with_capacity(8, raw).unwrap();
        rw.write(b"hello").unwrap();
        assert_eq!(rw.pending(), 5);
        assert_eq!(rw.seek(SeekFrom::Start(0)).unwrap(), 0);
        assert_eq!(rw.pending(), 0);
        assert_eq!(
            rw.read(Some(5)).unwrap(),
            ReadOutcome::Bytes(b"hello".to_vec())
        );
    }

    #[test]
    fn tell_prefers_the_write_side_while_writes_are_pending() {
        let raw = MemoryStream::from_bytes(b"abcdef".to_vec());
        let rw = BufferedRandom::with_capacity(4, raw).unwrap();
        rw.read(Some(2)).unwrap();
        assert_eq!(rw.tell().unwrap(), 2);
        rw.write(b"Z").unwrap();
        assert_eq!(rw.tell().unwrap(), 3);
        rw.flush().unwrap();
        assert_eq!(rw.tell().unwrap(), 3);
    }

    #[test]
    fn peek_drains_pending_writes_first() {
        let raw = MemoryStream::from_bytes(b"abc".to_vec());
        let rw = BufferedRandom::with_capacity(8, raw).unwrap();
        rw.write(b"Z").unwrap();
        assert_eq!(rw.peek(1).unwrap(), b"bc");
        assert_eq!(
            rw.read(Some(2)).unwrap(),
            ReadOutcome::Bytes(b"bc".to_vec())
        );
        let raw = rw.detach().unwrap();
        assert_eq!(raw.as_bytes(), b"Zbc");
    }

    #[test]
    fn relative_seek_is_from_the_logical_position() {
        let raw = MemoryStream::from_bytes(b"0123456789".to_vec());
        let rw = BufferedRandom::with_capacity(4, raw).unwrap();
        rw.read(Some(2)).unwrap();
        assert_eq!(rw.seek(SeekFrom::Current(3)).unwrap(), 5);
        assert_eq!(
            rw.read(Some(2)).unwrap(),
            ReadOutcome::Bytes(b"56".to_vec())
        );
    }

    #[test]
    fn truncate_at_logical_position_by_default() {
        let raw = MemoryStream::new();
        let rw = BufferedRandom::with_capacity(16, raw).unwrap();
        rw.write(b"abcdef").unwrap();
        rw.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(rw.truncate(None).unwrap(), 2);
        let raw = rw.detach().unwrap();
        assert_eq!(raw.as_bytes(), b"ab");
    }

    #[test]
    fn requires_a_fully_capable_raw() {
        struct NoSeek;
        impl RawStream for NoSeek {
            fn readable(&self) -> bool {
                true
            }
            fn writable(&self) -> bool {
                true
            }
            fn seekable(&self) -> bool {
                false
            }
        }
        assert!(matches!(
            BufferedRandom::new(NoSeek),
            Err(StreamError::Unsupported(_))
        ));
    }
}
