//! Opaque position tokens for the character layer.
//!
//! A logical text position cannot be a character count (arbitrarily
//! expensive to seek to) nor a bare byte offset (may land inside a
//! multi-byte sequence, and says nothing about decoder carry-state such as
//! a withheld CR). A token is instead a reconstruction recipe: a byte
//! offset where decoding is known to start clean, plus the little replay
//! needed to reach the exact position from there.

use crate::codec::{DecoderState, IncrementalDecoder};
use crate::error::{StreamError, StreamResult};

/// Opaque token naming a logical position in a text stream.
///
/// Produced by `tell` and honored by `seek` on the same stream, or on one
/// reading identical bytes with identical configuration. Tokens compare
/// for equality; comparing tokens taken under different configurations is
/// permitted by the types but means nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextPosition {
    /// Byte offset where the decoder starts with empty carry-over.
    pub(crate) start_pos: u64,
    /// Decoder flag word at `start_pos`.
    pub(crate) dec_flags: u64,
    /// Bytes to feed from `start_pos` to rebuild the interior state.
    pub(crate) bytes_to_feed: u64,
    /// Whether the replay must end with an end-of-data decode call.
    pub(crate) need_eof: bool,
    /// Decoded characters to discard after the replay.
    pub(crate) chars_to_skip: u64,
}

impl TextPosition {
    /// The very start of the stream.
    pub const START: TextPosition = TextPosition {
        start_pos: 0,
        dec_flags: 0,
        bytes_to_feed: 0,
        need_eof: false,
        chars_to_skip: 0,
    };

    /// Token that replays nothing: decoding starts clean at `pos`.
    pub(crate) fn at_byte(pos: u64, dec_flags: u64) -> Self {
        Self {
            start_pos: pos,
            dec_flags,
            bytes_to_feed: 0,
            need_eof: false,
            chars_to_skip: 0,
        }
    }

    pub(crate) fn is_start(self) -> bool {
        self == Self::START
    }
}

/// Target of a text-layer seek.
///
/// Only whole tokens and the two zero-offset forms exist; relative or
/// end-relative character arithmetic is unrepresentable because character
/// widths are unknowable without decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSeek {
    /// A token previously returned by `tell`, or [`TextPosition::START`].
    Absolute(TextPosition),
    /// Re-synchronize the byte layer at the current logical position.
    Current,
    /// Jump to the end of the stream.
    End,
}

/// Find the cheapest reconstruction recipe for the position exactly
/// `chars_to_skip` characters past a clean snapshot.
///
/// `next_input` is the undecoded input at the snapshot; `b2cratio` is the
/// observed bytes-per-character of the current chunk, used as the initial
/// guess. The guess backs off in doubling steps whenever it overshoots the
/// target or lands inside a sequence, then the remainder is fed one byte
/// at a time while tracking the nearest safe start point not past the
/// target. The caller restores the decoder's state afterwards.
pub(crate) fn locate(
    decoder: &mut dyn IncrementalDecoder,
    next_input: &[u8],
    snapshot_pos: u64,
    mut dec_flags: u64,
    mut chars_to_skip: u64,
    b2cratio: f64,
) -> StreamResult<TextPosition> {
    let mut skip_bytes = ((b2cratio * chars_to_skip as f64) as usize).min(next_input.len());
    let mut skip_back = 1usize;
    let mut clean = false;
    while skip_bytes > 0 {
        decoder.setstate(DecoderState::flags_only(dec_flags))?;
        let n = decoder.decode(&next_input[..skip_bytes], false)?.chars().count() as u64;
        if n <= chars_to_skip {
            let state = decoder.getstate();
            if state.pending.is_empty() {
                // Clean state at or before the target: walk from here.
                dec_flags = state.flags;
                chars_to_skip -= n;
                clean = true;
                break;
            }
            skip_bytes = skip_bytes.saturating_sub(state.pending.len());
            skip_back = 1;
        } else {
            skip_bytes = skip_bytes.saturating_sub(skip_back);
            skip_back *= 2;
        }
    }
    if !clean {
        skip_bytes = 0;
        decoder.setstate(DecoderState::flags_only(dec_flags))?;
    }

    let mut start_pos = snapshot_pos + skip_bytes as u64;
    let mut start_flags = dec_flags;
    if chars_to_skip == 0 {
        return Ok(TextPosition::at_byte(start_pos, start_flags));
    }

    let mut bytes_fed = 0u64;
    let mut chars_decoded = 0u64;
    let mut reached = false;
    for i in skip_bytes..next_input.len() {
        bytes_fed += 1;
        chars_decoded += decoder.decode(&next_input[i..=i], false)?.chars().count() as u64;
        let state = decoder.getstate();
        if state.pending.is_empty() && chars_decoded <= chars_to_skip {
            start_pos += bytes_fed;
            chars_to_skip -= chars_decoded;
            start_flags = state.flags;
            bytes_fed = 0;
            chars_decoded = 0;
        }
        if chars_decoded >= chars_to_skip {
            reached = true;
            break;
        }
    }
    let mut need_eof = false;
    if !reached {
        // The target hides behind the decoder's end-of-data flush.
        chars_decoded += decoder.decode(&[], true)?.chars().count() as u64;
        need_eof = true;
        if chars_decoded < chars_to_skip {
            return Err(StreamError::MalformedPosition(
                "can't reconstruct logical stream position".to_string(),
            ));
        }
    }
    Ok(TextPosition {
        start_pos,
        dec_flags: start_flags,
        bytes_to_feed: bytes_fed,
        need_eof,
        chars_to_skip,
    })
}
