//! Read-ahead engine and the read-only buffered layer.
//!
//! The engine functions operate on borrowed core + state so that
//! [`BufferedRandom`](crate::buffered::BufferedRandom) can reuse them under
//! its own lock with its flush discipline wrapped around.

use std::io::SeekFrom;

use parking_lot::Mutex;

use crate::buffered::{BufferedCore, ByteStream, DEFAULT_BUFFER_SIZE, ReadOutcome, ReaderState};
use crate::error::{StreamError, StreamResult};
use crate::raw::{RawRead, RawStream};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Satisfy a sized or to-end read request from the buffer plus raw stream.
pub(crate) fn read_some<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut ReaderState,
    n: Option<usize>,
) -> StreamResult<ReadOutcome> {
    let Some(n) = n else {
        return read_to_end(core, st);
    };
    if n == 0 {
        return Ok(ReadOutcome::Bytes(Vec::new()));
    }
    if n <= st.unconsumed() {
        // Fast path: fully buffered, no raw transfer.
        return Ok(ReadOutcome::Bytes(st.take(n)));
    }

    let mut out = st.take_all();
    let wanted = core.buffer_size().max(n);
    while out.len() < n {
        match core.raw()?.read(wanted)? {
            RawRead::Data(chunk) => out.extend_from_slice(&chunk),
            RawRead::Eof => {
                if out.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                break;
            }
            RawRead::WouldBlock => {
                if out.is_empty() {
                    return Ok(ReadOutcome::WouldBlock);
                }
                break;
            }
        }
    }
    if out.len() > n {
        // Keep the surplus as the new read-ahead.
        st.refill(out.split_off(n));
    }
    Ok(ReadOutcome::Bytes(out))
}

fn read_to_end<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut ReaderState,
) -> StreamResult<ReadOutcome> {
    let mut out = st.take_all();
    if core.has_readall() {
        match core.raw()?.readall()? {
            RawRead::Data(rest) => out.extend_from_slice(&rest),
            RawRead::Eof | RawRead::WouldBlock if !out.is_empty() => {}
            RawRead::Eof => return Ok(ReadOutcome::Eof),
            RawRead::WouldBlock => return Ok(ReadOutcome::WouldBlock),
        }
        return Ok(ReadOutcome::Bytes(out));
    }
    let chunk_len = core.buffer_size();
    loop {
        match core.raw()?.read(chunk_len)? {
            RawRead::Data(chunk) => out.extend_from_slice(&chunk),
            RawRead::Eof => {
                if out.is_empty() {
                    return Ok(ReadOutcome::Eof);
                }
                break;
            }
            RawRead::WouldBlock => {
                if out.is_empty() {
                    return Ok(ReadOutcome::WouldBlock);
                }
                break;
            }
        }
    }
    Ok(ReadOutcome::Bytes(out))
}

/// Top the buffer up with at most one raw transfer and expose what is there.
pub(crate) fn peek_some<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut ReaderState,
    n: usize,
) -> StreamResult<Vec<u8>> {
    let want = n.min(core.buffer_size());
    let have = st.unconsumed();
    if have < want || have == 0 {
        let to_read = core.buffer_size() - have;
        if let RawRead::Data(chunk) = core.raw()?.read(to_read)? {
            st.extend(&chunk);
        }
    }
    Ok(st.rest().to_vec())
}

/// One-shot read: at most one raw transfer, then hand out what is buffered.
pub(crate) fn read_one_shot<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut ReaderState,
    n: usize,
) -> StreamResult<ReadOutcome> {
    if n == 0 {
        return Ok(ReadOutcome::Bytes(Vec::new()));
    }
    if st.unconsumed() == 0 {
        let to_read = core.buffer_size();
        match core.raw()?.read(to_read)? {
            RawRead::Data(chunk) => st.refill(chunk),
            RawRead::Eof => return Ok(ReadOutcome::Eof),
            RawRead::WouldBlock => return Ok(ReadOutcome::WouldBlock),
        }
    }
    Ok(ReadOutcome::Bytes(st.take(n)))
}

/// Reposition, translating a relative offset by the unconsumed read-ahead.
pub(crate) fn seek_read<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &mut ReaderState,
    pos: SeekFrom,
) -> StreamResult<u64> {
    core.require_seekable()?;
    let pos = match pos {
        SeekFrom::Current(delta) => SeekFrom::Current(delta - st.unconsumed() as i64),
        other => other,
    };
    let new_pos = core.raw()?.seek(pos)?;
    st.reset();
    Ok(new_pos)
}

/// Logical offset: the raw offset minus what was fetched but not consumed.
pub(crate) fn tell_read<R: RawStream>(
    core: &mut BufferedCore<R>,
    st: &ReaderState,
) -> StreamResult<u64> {
    core.require_seekable()?;
    let raw_pos = core.raw()?.tell()?;
    raw_pos
        .checked_sub(st.unconsumed() as u64)
        .ok_or(StreamError::Invariant("raw offset behind buffered read-ahead"))
}

// ---------------------------------------------------------------------------
// Public layer
// ---------------------------------------------------------------------------

struct ReaderInner<R: RawStream> {
    core: BufferedCore<R>,
    read: ReaderState,
}

/// Buffered read-only layer over a readable raw stream.
///
/// Small reads are amortized by fetching `capacity`-sized chunks ahead;
/// `seek` and `tell` translate between the raw offset and the logical one
/// so the read-ahead is invisible to callers.
pub struct BufferedReader<R: RawStream> {
    inner: Mutex<ReaderInner<R>>,
}

impl<R: RawStream> BufferedReader<R> {
    /// Wrap `raw` with the default capacity.
    pub fn new(raw: R) -> StreamResult<Self> {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, raw)
    }

    /// Wrap `raw` with an explicit read-ahead capacity.
    pub fn with_capacity(capacity: usize, raw: R) -> StreamResult<Self> {
        if !raw.readable() {
            return Err(StreamError::Unsupported("stream is not readable"));
        }
        Ok(Self {
            inner: Mutex::new(ReaderInner {
                core: BufferedCore::new(raw, capacity),
                read: ReaderState::default(),
            }),
        })
    }

    /// Read exactly `n` bytes unless end-of-data or a stall cuts the result
    /// short; `None` reads to end-of-data.
    pub fn read(&self, n: Option<usize>) -> StreamResult<ReadOutcome> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        read_some(&mut inner.core, &mut inner.read, n)
    }

    /// Read up to `n` bytes with at most one raw transfer.
    pub fn read1(&self, n: usize) -> StreamResult<ReadOutcome> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        read_one_shot(&mut inner.core, &mut inner.read, n)
    }

    /// Look ahead without consuming; at most one raw transfer to top up.
    pub fn peek(&self, n: usize) -> StreamResult<Vec<u8>> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        peek_some(&mut inner.core, &mut inner.read, n)
    }

    /// Reposition the logical offset, discarding the read-ahead.
    pub fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        seek_read(&mut inner.core, &mut inner.read, pos)
    }

    /// Logical byte offset of the next read.
    pub fn tell(&self) -> StreamResult<u64> {
        let inner = &mut *self.inner.lock();
        inner.core.ensure_open()?;
        tell_read(&mut inner.core, &inner.read)
    }

    /// No pending writes on a reader; fails only on a closed stream.
    pub fn flush(&self) -> StreamResult<()> {
        self.inner.lock().core.ensure_open()
    }

    /// Close the raw stream. Idempotent.
    pub fn close(&self) -> StreamResult<()> {
        let inner = &mut *self.inner.lock();
        inner.read.reset();
        inner.core.close_raw()
    }

    /// Hand back the raw stream, leaving this layer unusable.
    pub fn detach(mut self) -> StreamResult<R> {
        let inner = self.inner.get_mut();
        inner.read.reset();
        inner.core.take_raw()
    }

    /// Bytes fetched ahead but not yet consumed.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.inner.lock().read.unconsumed()
    }

    /// Read-ahead capacity fixed at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().core.buffer_size()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().core.is_closed()
    }
}

impl<R: RawStream> ByteStream for BufferedReader<R> {
    fn read(&self, n: Option<usize>) -> StreamResult<ReadOutcome> {
        BufferedReader::read(self, n)
    }

    fn read1(&self, n: usize) -> StreamResult<ReadOutcome> {
        BufferedReader::read1(self, n)
    }

    fn has_read1(&self) -> bool {
        true
    }

    fn peek(&self, n: usize) -> StreamResult<Vec<u8>> {
        BufferedReader::peek(self, n)
    }

    fn flush(&self) -> StreamResult<()> {
        BufferedReader::flush(self)
    }

    fn close(&self) -> StreamResult<()> {
        BufferedReader::close(self)
    }

    fn is_closed(&self) -> bool {
        BufferedReader::is_closed(self)
    }

    fn seek(&self, pos: SeekFrom) -> StreamResult<u64> {
        BufferedReader::seek(self, pos)
    }

    fn tell(&self) -> StreamResult<u64> {
        BufferedReader::tell(self)
    }

    fn readable(&self) -> bool {
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

impl<R: RawStream> Drop for BufferedReader<R> {
    fn drop(&mut self) {
        let _ = self.inner.get_mut().core.close_raw();
    }
}
