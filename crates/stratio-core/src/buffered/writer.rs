//! Write-coalescing engine and the write-only buffered layer.
//!
//! The flush loop is the contract-enforcement point for raw writes: a raw
//! stream that accepts zero bytes of a non-empty slice, or reports more
//! than it was given, has broken the raw contract and the error says so
//! rather than looping or corrupting the buffer.

use std::io::SeekFrom;

use parking_lot::Mutex;

use crate::buffered::{BufferedCore, ByteStream, DEFAULT_BUFFER_SIZE, WriterState};
use crate::error::{StreamError, StreamResult};
use crate::raw::{RawStream, RawWrite};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Push buffered bytes down until the buffer is empty or the raw stalls.
/// A stall is reported with `accepted: 0`: none of the *caller's* bytes of
/// the current operation were taken, whatever earlier operations buffered.
pub(crate) fn flush_pending<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut WriterState,
) -> StreamResult<()> {
    while !st.is_empty() {
        match core.raw()?.write(st.as_slice())? {
            RawWrite::Accepted(0) => {
                return Err(StreamError::Invariant("raw write accepted zero bytes"));
            }
            RawWrite::Accepted(n) if n > st.pending() => {
                return Err(StreamError::Invariant(
                    "raw write over-reported accepted bytes",
                ));
            }
            RawWrite::Accepted(n) => st.consume_front(n),
            RawWrite::WouldBlock => return Err(StreamError::WouldBlock { accepted: 0 }),
        }
    }
    Ok(())
}

/// Coalesce `data` into the buffer, flushing eagerly once over capacity.
///
/// On a mid-flush stall the buffer is cut back to capacity and the error
/// reports how many of `data`'s bytes remain held; the caller re-submits
/// the rest once the raw stream is writable again.
pub(crate) fn write_coalesced<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut WriterState,
    data: &[u8],
) -> StreamResult<usize> {
    if st.pending() > core.buffer_size() {
        // Over capacity from an earlier stall: push before accepting more.
        flush_pending(core, st)?;
    }
    st.append(data);
    let written = data.len();
    if st.pending() > core.buffer_size() {
        match flush_pending(core, st) {
            Ok(()) => {}
            Err(StreamError::WouldBlock { .. }) => {
                if st.pending() > core.buffer_size() {
                    let overage = st.trim_to(core.buffer_size());
                    return Err(StreamError::WouldBlock {
                        accepted: written - overage,
                    });
                }
                // The partial flush made enough room; everything is held.
            }
            Err(other) => return Err(other),
        }
    }
    Ok(written)
}

/// Logical offset: the raw offset plus what is buffered ahead of it.
pub(crate) fn tell_write<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &WriterState,
) -> StreamResult<u64> {
    core.require_seekable()?;
    let raw_pos = core.raw()?.tell()?;
    Ok(raw_pos + st.pending() as u64)
}

// ---------------------------------------------------------------------------
// Public layer
// ---------------------------------------------------------------------------

struct WriterInner<R: RawStream> {
    core: BufferedCore<R>,
    write: WriterState,
}

/// Buffered write-only layer over a writable raw stream.
///
/// Small writes are held until the buffer passes its capacity, then pushed
/// down in as few raw transfers as the raw stream allows. Unflushed bytes
/// survive a failed flush, so `flush` and `close` can be retried.
pub struct BufferedWriter<R: RawStream> {
    inner: Mutex<WriterInner<R>>,
}

impl<R: RawStream> BufferedWriter<R> {
    /// Wrap `raw` with the default capacity.
    pub fn new(raw: R) -> StreamResult<Self> {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, raw)
    }

    /// Wrap `raw` with an explicit coalescing capacity.
    pub fn with_capacity(capacity: usize, raw: R) -> StreamResult<Self> {
        if !raw.writable() {
            return Err(StreamError::Unsupported("stream is not writable"));
        }
        Ok(Self {
            inner: Mutex::new(WriterInner {
                core: BufferedCore::new(raw, capacity),
                write: WriterState::default(),
            }),
        })
    }

    /// Accept all of `data` into the buffer, flushing past capacity.
    pub fn write(&self, data: &[u8]) -> StreamResult<usize> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        write_coalesced(&mut inner.core, &mut inner.write, data)
    }

    /// Push everything buffered down to the raw stream.
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
        inner.write.clear();
        flushed.and(closed)
    }

    /// Reposition after pushing pending writes down.
    pub fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        inner.core.require_seekable()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.core.raw()?.seek(pos)
    }

    /// Logical byte offset of the next write.
    pub fn tell(&self) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        tell_write(&mut inner.core, &inner.write)
    }

    /// Resize the raw stream after pushing pending writes down.
    pub fn truncate(&self, size: Option<u64>) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.core.raw()?.truncate(size)
    }

    /// Flush, then hand back the raw stream, leaving this layer unusable.
    /// The stream is dropped (and the raw endpoint closed) if the flush
    /// fails.
    pub fn detach(mut self) -> StreamResult<R> {
        let inner = self.inner.get_mut();
        flush_pending(&mut inner.core, &mut inner.write)?;
        inner.core.take_raw()
    }

    /// Bytes accepted but not yet pushed to the raw stream.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock().write.pending()
    }

    /// Coalescing capacity fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().core.buffer_size()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().core.is_closed()
    }
}

impl<R: RawStream> ByteStream for BufferedWriter<R> {
    fn write(&self, data: &[u8]) -> StreamResult<usize> {
        BufferedWriter::write(self, data)
    }

    fn flush(&self) -> StreamResult<()> {
        BufferedWriter::flush(self)
    }

    fn close(&self) -> StreamResult<()> {
        BufferedWriter::close(self)
    }

    fn is_closed(&self) -> bool {
        BufferedWriter::is_closed(self)
    }

    fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        BufferedWriter::seek(self, pos)
    }

    fn tell(&self) -> StreamResult<u64> {
        BufferedWriter::tell(self)
    }

    fn truncate(&self, size: Option<u64>) -> StreamResult<u64> {
        BufferedWriter::truncate(self, size)
    }

    fn writable(&self) -> bool {
        true
    }

    fn seekable(&self) -> bool {
        self.inner.lock().core.is_seekable()
    }

    fn fileno(&self) -> StreamResult<i32> {
        self.inner.lock().core.fileno()
    }

    fn isatty(&self) -> bool {
        self.inner.lock().core.isatty()
    }
}

impl<R: RawStream> Drop for BufferedWriter<R> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if !inner.core.is_closed() {
            let _ = flush_pending(&mut inner.core, &mut inner.write);
        }
        let _ = inner.core.close_raw();
    }
}
