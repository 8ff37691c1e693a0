//! Incremental codec contract and the shipped reference codecs.
//!
//! Decoders are incremental: input arrives in arbitrary chunks, multi-byte
//! sequences may split anywhere, and unresolved trailing bytes are carried
//! over to the next call. The carry-over plus an opaque flag word is
//! exposed through `getstate`/`setstate` so the text layer can snapshot
//! decode state at a byte offset and later reproduce it exactly.

mod ascii;
mod latin1;
mod newline;
mod utf8;

pub use ascii::{AsciiDecoder, AsciiEncoder};
pub use latin1::{Latin1Decoder, Latin1Encoder};
pub use newline::{NewlineDecoder, NewlineSeen};
pub use utf8::{Utf8Decoder, Utf8Encoder};

use crate::error::StreamResult;

/// Replacement character substituted for undecodable input.
pub const REPLACEMENT: char = '\u{FFFD}';

/// Snapshot of incremental decode state: input bytes buffered but not yet
/// decoded, plus a flag word whose meaning is private to the codec that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecoderState {
    pub pending: Vec<u8>,
    pub flags: u64,
}

impl DecoderState {
    /// State with no carry-over and the given flag word.
    #[must_use]
    pub fn flags_only(flags: u64) -> Self {
        Self {
            pending: Vec::new(),
            flags,
        }
    }
}

/// Chunk-at-a-time byte-to-text decoder.
///
/// After a decode error the carry-over is unspecified; `reset` (or
/// `setstate`) before reusing the decoder.
pub trait IncrementalDecoder: Send {
    /// Decode one chunk. `eof` marks the final chunk: carry-over must be
    /// resolved, by the error policy if necessary, never silently dropped.
    fn decode(&mut self, input: &[u8], eof: bool) -> StreamResult<String>;

    /// Snapshot the current carry-over and flag word.
    fn getstate(&self) -> DecoderState;

    /// Restore a state previously produced by `getstate` on a decoder of
    /// the same codec.
    fn setstate(&mut self, state: DecoderState) -> StreamResult<()>;

    /// Return to the freshly constructed state.
    fn reset(&mut self);
}

/// Chunk-at-a-time text-to-byte encoder. The shipped codecs are stateless,
/// so `reset` exists for the contract rather than for them.
pub trait IncrementalEncoder: Send {
    fn encode(&mut self, input: &str) -> StreamResult<Vec<u8>>;

    fn reset(&mut self);
}

/// What to do with input outside the codec's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Surface an error naming the offending offset.
    #[default]
    Strict,
    /// Substitute `U+FFFD` when decoding, `?` when encoding.
    Replace,
    /// Drop the offending input.
    Ignore,
}

/// The shipped codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Variable-width; the only codec here with real carry-over.
    #[default]
    Utf8,
    /// Bytes 0x00..=0x7F.
    Ascii,
    /// Byte-transparent: every byte maps to the code point of its value.
    Latin1,
}

impl Encoding {
    /// Resolve a codec from its conventional names and aliases.
    #[must_use]
    pub fn parse(name: &str) -> Option<Encoding> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Encoding::Utf8),
            "ascii" | "us-ascii" => Some(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Some(Encoding::Latin1),
            _ => None,
        }
    }

    /// Canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Ascii => "ascii",
            Encoding::Latin1 => "latin-1",
        }
    }

    /// Fresh incremental decoder for this codec.
    #[must_use]
    pub fn new_decoder(self, policy: ErrorPolicy) -> Box<dyn IncrementalDecoder> {
        match self {
            Encoding::Utf8 => Box::new(Utf8Decoder::new(policy)),
            Encoding::Ascii => Box::new(AsciiDecoder::new(policy)),
            Encoding::Latin1 => Box::new(Latin1Decoder::new()),
        }
    }

    /// Fresh incremental encoder for this codec.
    #[must_use]
    pub fn new_encoder(self, policy: ErrorPolicy) -> Box<dyn IncrementalEncoder> {
        match self {
            Encoding::Utf8 => Box::new(Utf8Encoder::default()),
            Encoding::Ascii => Box::new(AsciiEncoder::new(policy)),
            Encoding::Latin1 => Box::new(Latin1Encoder::new(policy)),
        }
    }
}
