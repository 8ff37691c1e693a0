//! Character stream over a byte stream.
//!
//! `TextStream` owns a [`ByteStream`], an incremental decoder for the read
//! side and an incremental encoder for the write side. Reads pull byte
//! chunks, decode them, and serve characters out of the decoded buffer;
//! writes encode and hand the bytes down. Logical positions are the opaque
//! tokens in [`super::position`], reconstructed by replaying a small span
//! of bytes through the decoder.
//!
//! Design notes
//!
//! - The decoded buffer holds exactly one chunk's worth of output. Every
//!   chunk read (while position tracking is live) also snapshots the
//!   decoder's flag word and undecoded input from just before the chunk,
//!   which is all `tell` needs to rebuild any position inside the chunk.
//! - All state lives behind `&mut self`. The byte layer handles its own
//!   locking; the character layer is a single-caller surface.

use std::io::SeekFrom;

use memchr::{memchr, memmem};

use crate::buffered::{ByteStream, ReadOutcome};
use crate::codec::{
    DecoderState, Encoding, ErrorPolicy, IncrementalDecoder, IncrementalEncoder, NewlineDecoder,
    NewlineSeen,
};
use crate::error::{StreamError, StreamResult};
use crate::text::position::{locate, TextPosition, TextSeek};
use crate::text::{NewlineMode, TextConfig};

// ---------------------------------------------------------------------------
// Decoded-character buffer
// ---------------------------------------------------------------------------

/// One chunk of decoded text plus a consumption cursor.
///
/// `char_pos` counts characters consumed since the last snapshot; `tell`
/// turns that count into a reconstruction recipe.
#[derive(Debug, Default)]
struct DecodedChars {
    text: String,
    byte_pos: usize,
    char_pos: usize,
}

impl DecodedChars {
    fn set(&mut self, text: String) {
        self.text = text;
        self.byte_pos = 0;
        self.char_pos = 0;
    }

    fn clear(&mut self) {
        self.set(String::new());
    }

    fn has_rest(&self) -> bool {
        self.byte_pos < self.text.len()
    }

    fn consumed_chars(&self) -> usize {
        self.char_pos
    }

    /// Consume up to `limit` characters (all of them for `None`).
    fn take(&mut self, limit: Option<usize>) -> String {
        let rest = &self.text[self.byte_pos..];
        let (out, nchars) = match limit {
            None => (rest.to_string(), rest.chars().count()),
            Some(limit) => match rest.char_indices().nth(limit) {
                Some((end, _)) => (rest[..end].to_string(), limit),
                None => (rest.to_string(), rest.chars().count()),
            },
        };
        self.byte_pos += out.len();
        self.char_pos += nchars;
        out
    }

    /// Give back the last `nchars` consumed characters.
    fn rewind(&mut self, nchars: usize) -> StreamResult<()> {
        self.char_pos = self
            .char_pos
            .checked_sub(nchars)
            .ok_or(StreamError::Invariant("rewind past decoded-chunk start"))?;
        self.byte_pos = char_boundary(&self.text, self.char_pos);
        Ok(())
    }
}

/// Byte index of the `nchars`-th character, or the end of the string.
fn char_boundary(text: &str, nchars: usize) -> usize {
    match text.char_indices().nth(nchars) {
        Some((idx, _)) => idx,
        None => text.len(),
    }
}

// ---------------------------------------------------------------------------
// Read-side decoder selection
// ---------------------------------------------------------------------------

/// The read-side decoder, with or without newline recognition.
///
/// Universal and preserving modes wrap the character codec in a
/// [`NewlineDecoder`]; an exact terminator mode reads the codec bare, since
/// line splitting then needs no normalization and no withheld CR.
enum ActiveDecoder {
    Newline(NewlineDecoder),
    Plain(Box<dyn IncrementalDecoder>),
}

impl ActiveDecoder {
    fn newlines_seen(&self) -> Option<NewlineSeen> {
        match self {
            ActiveDecoder::Newline(dec) => Some(dec.newlines_seen()),
            ActiveDecoder::Plain(_) => None,
        }
    }
}

impl IncrementalDecoder for ActiveDecoder {
    fn decode(&mut self, input: &[u8], eof: bool) -> StreamResult<String> {
        match self {
            ActiveDecoder::Newline(dec) => dec.decode(input, eof),
            ActiveDecoder::Plain(dec) => dec.decode(input, eof),
        }
    }

    fn getstate(&self) -> DecoderState {
        match self {
            ActiveDecoder::Newline(dec) => dec.getstate(),
            ActiveDecoder::Plain(dec) => dec.getstate(),
        }
    }

    fn setstate(&mut self, state: DecoderState) -> StreamResult<()> {
        match self {
            ActiveDecoder::Newline(dec) => dec.setstate(state),
            ActiveDecoder::Plain(dec) => dec.setstate(state),
        }
    }

    fn reset(&mut self) {
        match self {
            ActiveDecoder::Newline(dec) => dec.reset(),
            ActiveDecoder::Plain(dec) => dec.reset(),
        }
    }
}

fn require_decoder(dec: Option<&mut ActiveDecoder>) -> StreamResult<&mut ActiveDecoder> {
    dec.ok_or(StreamError::Invariant("decoder not initialized"))
}

fn require_encoder(
    enc: Option<&mut Box<dyn IncrementalEncoder>>,
) -> StreamResult<&mut Box<dyn IncrementalEncoder>> {
    enc.ok_or(StreamError::Invariant("encoder not initialized"))
}

// ---------------------------------------------------------------------------
// Line-terminator scanning
// ---------------------------------------------------------------------------

enum ScanStep {
    /// Byte offset just past the terminator.
    Found(usize),
    /// No terminator yet; byte offset where the next scan resumes.
    NotYet(usize),
}

fn scan_terminator(mode: NewlineMode, line: &str, start: usize) -> ScanStep {
    let bytes = line.as_bytes();
    match mode {
        // Translated input: every terminator is already "\n".
        NewlineMode::Universal => match memchr(b'\n', &bytes[start..]) {
            Some(i) => ScanStep::Found(start + i + 1),
            None => ScanStep::NotYet(bytes.len()),
        },
        NewlineMode::Preserve => {
            // The decoder withholds a chunk-final CR, so a CR seen here is
            // never the first half of a split CRLF.
            let lf = memchr(b'\n', &bytes[start..]).map(|i| start + i);
            let cr = memchr(b'\r', &bytes[start..]).map(|i| start + i);
            match (lf, cr) {
                (None, None) => ScanStep::NotYet(bytes.len()),
                (Some(lf), None) => ScanStep::Found(lf + 1),
                (None, Some(cr)) => ScanStep::Found(cr + 1),
                (Some(lf), Some(cr)) => {
                    if lf < cr || lf == cr + 1 {
                        ScanStep::Found(lf + 1)
                    } else {
                        ScanStep::Found(cr + 1)
                    }
                }
            }
        }
        NewlineMode::Exact(term) => {
            // Rescan from the top each round; a two-byte terminator may
            // straddle the previous chunk boundary.
            let needle = term.as_str().as_bytes();
            match memmem::find(bytes, needle) {
                Some(i) => ScanStep::Found(i + needle.len()),
                None => ScanStep::NotYet(bytes.len()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TextStream
// ---------------------------------------------------------------------------

/// Buffered character stream layered over a [`ByteStream`].
pub struct TextStream<B: ByteStream> {
    buffer: Option<B>,
    encoding: Encoding,
    policy: ErrorPolicy,
    newline: NewlineMode,
    line_buffering: bool,
    write_through: bool,
    chunk_size: usize,
    readable: bool,
    writable: bool,
    seekable: bool,
    has_read1: bool,
    /// False while a `lines` iterator is live; restored by `flush`.
    telling: bool,
    closed: bool,
    decoder: Option<ActiveDecoder>,
    encoder: Option<Box<dyn IncrementalEncoder>>,
    decoded: DecodedChars,
    /// Decoder flag word and undecoded input from just before the current
    /// chunk. `None` when no reconstructible chunk is loaded.
    snapshot: Option<(u64, Vec<u8>)>,
    /// Bytes per character observed in the current chunk; seeds the search
    /// in [`locate`].
    b2cratio: f64,
}

impl<B: ByteStream> TextStream<B> {
    /// Wrap `buffer` with the default configuration: UTF-8, strict errors,
    /// universal newlines.
    pub fn new(buffer: B) -> Self {
        Self::with_config(buffer, TextConfig::default())
    }

    pub fn with_config(buffer: B, config: TextConfig) -> Self {
        let readable = buffer.readable();
        let writable = buffer.writable();
        let seekable = buffer.seekable();
        let has_read1 = buffer.has_read1();
        Self {
            buffer: Some(buffer),
            encoding: config.encoding,
            policy: config.policy,
            newline: config.newline,
            line_buffering: config.line_buffering,
            write_through: config.write_through,
            chunk_size: config.chunk_size.max(1),
            readable,
            writable,
            seekable,
            has_read1,
            telling: seekable,
            closed: false,
            decoder: None,
            encoder: None,
            decoded: DecodedChars::default(),
            snapshot: None,
            b2cratio: 0.0,
        }
    }

    // -- internal plumbing --------------------------------------------------

    fn ensure_open(&self) -> StreamResult<()> {
        if self.is_closed() {
            Err(StreamError::Closed)
        } else {
            Ok(())
        }
    }

    fn byte_buffer(&self) -> StreamResult<&B> {
        self.buffer.as_ref().ok_or(StreamError::Closed)
    }

    fn ensure_decoder(&mut self) {
        if self.decoder.is_none() {
            let inner = self.encoding.new_decoder(self.policy);
            self.decoder = Some(if self.newline.read_wrapped() {
                ActiveDecoder::Newline(NewlineDecoder::new(inner, self.newline.read_translate()))
            } else {
                ActiveDecoder::Plain(inner)
            });
        }
    }

    fn ensure_encoder(&mut self) {
        if self.encoder.is_none() {
            self.encoder = Some(self.encoding.new_encoder(self.policy));
        }
    }

    /// Pull one chunk from the byte layer into the decoded buffer.
    ///
    /// Returns false when the byte layer hit end-of-data. The decoded
    /// buffer may still have gained characters in that case, from the
    /// decoder resolving its carry-over.
    fn read_chunk(&mut self) -> StreamResult<bool> {
        self.ensure_decoder();
        let snapshot_base = if self.telling {
            Some(require_decoder(self.decoder.as_mut())?.getstate())
        } else {
            None
        };

        let outcome = {
            let buffer = self.byte_buffer()?;
            if self.has_read1 {
                buffer.read1(self.chunk_size)?
            } else {
                buffer.read(Some(self.chunk_size))?
            }
        };
        let (chunk, eof) = match outcome {
            ReadOutcome::Bytes(bytes) => (bytes, false),
            ReadOutcome::Eof => (Vec::new(), true),
            ReadOutcome::WouldBlock => return Err(StreamError::WouldBlock { accepted: 0 }),
        };

        let decoded = require_decoder(self.decoder.as_mut())?.decode(&chunk, eof)?;
        let nchars = decoded.chars().count();
        self.b2cratio = if nchars > 0 {
            chunk.len() as f64 / nchars as f64
        } else {
            0.0
        };
        self.decoded.set(decoded);

        if let Some(state) = snapshot_base {
            let mut next_input = state.pending;
            next_input.extend_from_slice(&chunk);
            self.snapshot = Some((state.flags, next_input));
        }
        Ok(!eof)
    }

    // -- reading ------------------------------------------------------------

    /// Read and decode up to `n` characters; `None` reads to end-of-data.
    ///
    /// Returns an empty string only at end-of-data.
    pub fn read(&mut self, n: Option<usize>) -> StreamResult<String> {
        self.ensure_open()?;
        if !self.readable {
            return Err(StreamError::Unsupported("stream is not readable"));
        }
        self.ensure_decoder();
        match n {
            None => {
                let mut result = self.decoded.take(None);
                let rest = match self.byte_buffer()?.read(None)? {
                    ReadOutcome::Bytes(bytes) => bytes,
                    ReadOutcome::Eof => Vec::new(),
                    ReadOutcome::WouldBlock => {
                        return Err(StreamError::WouldBlock { accepted: 0 });
                    }
                };
                let tail = require_decoder(self.decoder.as_mut())?.decode(&rest, true)?;
                result.push_str(&tail);
                self.decoded.clear();
                self.snapshot = None;
                Ok(result)
            }
            Some(n) => {
                let mut result = self.decoded.take(Some(n));
                let mut got = result.chars().count();
                while got < n {
                    let more_coming = self.read_chunk()?;
                    let more = self.decoded.take(Some(n - got));
                    got += more.chars().count();
                    result.push_str(&more);
                    if !more_coming {
                        break;
                    }
                }
                Ok(result)
            }
        }
    }

    /// Read one line, terminator included.
    ///
    /// What counts as a terminator follows the newline mode; `limit` caps
    /// the result at that many characters even without a terminator. An
    /// empty string means end-of-data.
    pub fn read_line(&mut self, limit: Option<usize>) -> StreamResult<String> {
        self.ensure_open()?;
        if !self.readable {
            return Err(StreamError::Unsupported("stream is not readable"));
        }
        self.ensure_decoder();

        let mut line = self.decoded.take(None);
        let mut line_chars = line.chars().count();
        let mut start = 0usize;
        let endpos = loop {
            match scan_terminator(self.newline, &line, start) {
                ScanStep::Found(end) => break end,
                ScanStep::NotYet(resume) => start = resume,
            }
            if let Some(limit) = limit {
                if line_chars >= limit {
                    break char_boundary(&line, limit);
                }
            }
            loop {
                let more_coming = self.read_chunk()?;
                if self.decoded.has_rest() || !more_coming {
                    break;
                }
            }
            if self.decoded.has_rest() {
                let more = self.decoded.take(None);
                line_chars += more.chars().count();
                line.push_str(&more);
            } else {
                // End of data; the unterminated tail is the final line.
                self.decoded.clear();
                self.snapshot = None;
                return Ok(line);
            }
        };

        let endpos = match limit {
            Some(limit) => endpos.min(char_boundary(&line, limit)),
            None => endpos,
        };
        self.decoded.rewind(line[endpos..].chars().count())?;
        line.truncate(endpos);
        Ok(line)
    }

    /// Read every remaining line.
    pub fn read_lines(&mut self) -> StreamResult<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line(None)?;
            if line.is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    /// Iterate over lines.
    ///
    /// Position tracking is suspended while iterating, which makes the
    /// per-chunk snapshot bookkeeping free; `flush` or `seek` turn it back
    /// on.
    pub fn lines(&mut self) -> Lines<'_, B> {
        self.telling = false;
        Lines { stream: self }
    }

    // -- writing ------------------------------------------------------------

    /// Encode `text` and hand it to the byte layer; returns the number of
    /// characters accepted (always all of them, or an error).
    ///
    /// In universal mode every `\n` is written as the platform terminator;
    /// an exact mode writes its configured terminator; preserving mode
    /// writes the text untouched. With `line_buffering`, a terminator in
    /// `text` flushes the byte layer; with `write_through`, every write
    /// does.
    pub fn write(&mut self, text: &str) -> StreamResult<usize> {
        self.ensure_open()?;
        if !self.writable {
            return Err(StreamError::Unsupported("stream is not writable"));
        }
        let length = text.chars().count();
        self.ensure_encoder();
        let encoder = require_encoder(self.encoder.as_mut())?;
        let encoded = match self.newline.write_terminator() {
            Some(nl) if text.contains('\n') => encoder.encode(&text.replace('\n', nl))?,
            _ => encoder.encode(text)?,
        };
        self.byte_buffer()?.write(&encoded)?;

        if self.line_buffering && (text.contains('\n') || text.contains('\r')) {
            self.flush()?;
        }
        if self.write_through {
            self.byte_buffer()?.flush()?;
        }

        // Written bytes invalidate any read-ahead decode state.
        self.decoded.clear();
        self.snapshot = None;
        if let Some(dec) = self.decoder.as_mut() {
            dec.reset();
        }
        Ok(length)
    }

    /// Write every item in order. No terminators are added.
    pub fn write_lines<I>(&mut self, lines: I) -> StreamResult<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }

    /// Flush the byte layer and resume position tracking.
    pub fn flush(&mut self) -> StreamResult<()> {
        self.ensure_open()?;
        self.byte_buffer()?.flush()?;
        self.telling = self.seekable;
        Ok(())
    }

    // -- positioning --------------------------------------------------------

    /// Token for the current logical position.
    pub fn tell(&mut self) -> StreamResult<TextPosition> {
        self.ensure_open()?;
        if !self.seekable {
            return Err(StreamError::Unsupported("underlying stream is not seekable"));
        }
        if !self.telling {
            return Err(StreamError::Unsupported(
                "position is untracked during line iteration",
            ));
        }
        self.flush()?;
        let position = self.byte_buffer()?.tell()?;

        let (dec_flags, next_input) = match self.snapshot.clone() {
            Some(snapshot) if self.decoder.is_some() => snapshot,
            _ => {
                // Nothing decoded ahead; the byte position is the answer.
                if self.decoded.has_rest() {
                    return Err(StreamError::Invariant(
                        "decoded characters pending without a snapshot",
                    ));
                }
                return Ok(TextPosition::at_byte(position, 0));
            }
        };
        let snapshot_pos = position
            .checked_sub(next_input.len() as u64)
            .ok_or(StreamError::Invariant("snapshot larger than byte position"))?;
        let chars_to_skip = self.decoded.consumed_chars() as u64;
        if chars_to_skip == 0 {
            return Ok(TextPosition::at_byte(snapshot_pos, dec_flags));
        }

        let b2cratio = self.b2cratio;
        let decoder = require_decoder(self.decoder.as_mut())?;
        let saved = decoder.getstate();
        let located = locate(
            decoder,
            &next_input,
            snapshot_pos,
            dec_flags,
            chars_to_skip,
            b2cratio,
        );
        let restored = decoder.setstate(saved);
        let cookie = located?;
        restored?;
        Ok(cookie)
    }

    /// Move to `target` and return the token for the new position.
    ///
    /// Absolute targets must be tokens minted by `tell` on this stream (or
    /// [`TextPosition::START`]); anything else reconstructs garbage or
    /// fails with [`StreamError::MalformedPosition`].
    pub fn seek(&mut self, target: TextSeek) -> StreamResult<TextPosition> {
        self.ensure_open()?;
        if !self.seekable {
            return Err(StreamError::Unsupported("underlying stream is not seekable"));
        }
        let cookie = match target {
            TextSeek::Current => {
                let here = self.tell()?;
                return self.seek(TextSeek::Absolute(here));
            }
            TextSeek::End => {
                self.flush()?;
                let end = self.byte_buffer()?.seek(SeekFrom::End(0))?;
                self.decoded.clear();
                self.snapshot = None;
                if let Some(dec) = self.decoder.as_mut() {
                    dec.reset();
                }
                if let Some(enc) = self.encoder.as_mut() {
                    enc.reset();
                }
                return Ok(TextPosition::at_byte(end, 0));
            }
            TextSeek::Absolute(cookie) => cookie,
        };

        self.flush()?;
        self.byte_buffer()?.seek(SeekFrom::Start(cookie.start_pos))?;
        self.decoded.clear();
        self.snapshot = None;

        if cookie.is_start() {
            if let Some(dec) = self.decoder.as_mut() {
                dec.reset();
            }
        } else if self.decoder.is_some() || cookie.dec_flags != 0 || cookie.chars_to_skip != 0 {
            self.ensure_decoder();
            require_decoder(self.decoder.as_mut())?
                .setstate(DecoderState::flags_only(cookie.dec_flags))?;
            self.snapshot = Some((cookie.dec_flags, Vec::new()));
        }

        if cookie.chars_to_skip > 0 {
            // Replay the recipe: feed the recorded span, then discard the
            // characters that precede the target.
            let chunk = match self.byte_buffer()?.read(Some(cookie.bytes_to_feed as usize))? {
                ReadOutcome::Bytes(bytes) => bytes,
                ReadOutcome::Eof => Vec::new(),
                ReadOutcome::WouldBlock => return Err(StreamError::WouldBlock { accepted: 0 }),
            };
            self.snapshot = Some((cookie.dec_flags, chunk.clone()));
            let decoded =
                require_decoder(self.decoder.as_mut())?.decode(&chunk, cookie.need_eof)?;
            let nchars = decoded.chars().count() as u64;
            self.decoded.set(decoded);
            if nchars < cookie.chars_to_skip {
                return Err(StreamError::MalformedPosition(
                    "can't restore logical stream position".to_string(),
                ));
            }
            let _ = self.decoded.take(Some(cookie.chars_to_skip as usize));
        }

        if let Some(enc) = self.encoder.as_mut() {
            enc.reset();
        }
        Ok(cookie)
    }

    /// Resize the underlying stream.
    ///
    /// `None` truncates at the current logical position, which must not sit
    /// mid-reconstruction; pass an explicit byte size to bypass that check.
    pub fn truncate(&mut self, size: Option<u64>) -> StreamResult<u64> {
        self.ensure_open()?;
        self.flush()?;
        match size {
            Some(size) => self.byte_buffer()?.truncate(Some(size)),
            None => {
                let cookie = self.tell()?;
                if cookie.bytes_to_feed != 0 || cookie.chars_to_skip != 0 || cookie.need_eof {
                    return Err(StreamError::Unsupported(
                        "truncate at a mid-sequence position",
                    ));
                }
                self.byte_buffer()?.truncate(Some(cookie.start_pos))
            }
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Flush and close. Idempotent; the first error wins but the byte layer
    /// is closed regardless.
    pub fn close(&mut self) -> StreamResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let flushed = self.flush();
        let closed = match self.buffer.as_ref() {
            Some(buffer) => buffer.close(),
            None => Ok(()),
        };
        self.closed = true;
        self.decoded.clear();
        self.snapshot = None;
        flushed.and(closed)
    }

    /// Flush and give back the byte layer, consuming the character layer.
    pub fn detach(mut self) -> StreamResult<B> {
        self.flush()?;
        self.closed = true;
        self.buffer.take().ok_or(StreamError::Closed)
    }

    // -- introspection ------------------------------------------------------

    pub fn is_closed(&self) -> bool {
        self.closed || self.buffer.is_none()
    }

    /// Terminators observed by the read-side decoder so far. `None` in an
    /// exact terminator mode, where nothing is tracked.
    pub fn newlines_seen(&self) -> Option<NewlineSeen> {
        self.decoder.as_ref().and_then(ActiveDecoder::newlines_seen)
    }

    /// The wrapped byte layer, while attached.
    pub fn byte_stream(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.policy
    }

    #[must_use]
    pub fn newline_mode(&self) -> NewlineMode {
        self.newline
    }

    #[must_use]
    pub fn line_buffering(&self) -> bool {
        self.line_buffering
    }

    #[must_use]
    pub fn write_through(&self) -> bool {
        self.write_through
    }

    #[must_use]
    pub fn readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub fn seekable(&self) -> bool {
        self.seekable
    }

    pub fn fileno(&self) -> StreamResult<i32> {
        self.byte_buffer()?.fileno()
    }

    pub fn isatty(&self) -> bool {
        match self.buffer.as_ref() {
            Some(buffer) => buffer.isatty(),
            None => false,
        }
    }
}

impl<B: ByteStream> Drop for TextStream<B> {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

/// Iterator over lines; yields no empty strings and stops at end-of-data.
pub struct Lines<'a, B: ByteStream> {
    stream: &'a mut TextStream<B>,
}

impl<B: ByteStream> Iterator for Lines<'_, B> {
    type Item = StreamResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.stream.read_line(None) {
            Ok(line) if line.is_empty() => None,
            Ok(line) => Some(Ok(line)),
            Err(err) => Some(Err(err)),
        }
    }
}
