//! Incremental UTF-8 codec.
//!
//! The decoder carries at most three bytes between calls: the longest
//! prefix of a sequence that is valid so far but incomplete. Invalid input
//! is handled per policy at the granularity of the maximal invalid
//! subpart, so two stray continuation bytes produce two replacement
//! characters, while one truncated three-byte sequence produces one.

use crate::codec::{DecoderState, ErrorPolicy, IncrementalDecoder, IncrementalEncoder, REPLACEMENT};
use crate::error::{StreamError, StreamResult};

/// Chunk-at-a-time UTF-8 decoder with carry-over for split sequences.
#[derive(Debug)]
pub struct Utf8Decoder {
    policy: ErrorPolicy,
    pending: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
        }
    }
}

fn checked_prefix(bytes: &[u8]) -> StreamResult<&str> {
    std::str::from_utf8(bytes)
        .map_err(|_| StreamError::Invariant("utf-8 prefix failed re-validation"))
}

impl IncrementalDecoder for Utf8Decoder {
    fn decode(&mut self, input: &[u8], eof: bool) -> StreamResult<String> {
        let owned;
        let mut rest: &[u8] = if self.pending.is_empty() {
            input
        } else {
            let mut work = std::mem::take(&mut self.pending);
            work.extend_from_slice(input);
            owned = work;
            &owned
        };

        let mut out = String::with_capacity(rest.len());
        let mut offset = 0usize;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(checked_prefix(&rest[..valid])?);
                    rest = &rest[valid..];
                    offset += valid;
                    match err.error_len() {
                        Some(bad) => {
                            match self.policy {
                                ErrorPolicy::Strict => {
                                    return Err(StreamError::Decode(format!(
                                        "invalid utf-8 byte 0x{:02x} at offset {offset}",
                                        rest[0]
                                    )));
                                }
                                ErrorPolicy::Replace => out.push(REPLACEMENT),
                                ErrorPolicy::Ignore => {}
                            }
                            rest = &rest[bad..];
                            offset += bad;
                        }
                        // Incomplete sequence at the end of the chunk.
                        None => break,
                    }
                }
            }
        }

        if !rest.is_empty() {
            if eof {
                match self.policy {
                    ErrorPolicy::Strict => {
                        return Err(StreamError::Decode(format!(
                            "truncated utf-8 sequence at offset {offset}"
                        )));
                    }
                    ErrorPolicy::Replace => out.push(REPLACEMENT),
                    ErrorPolicy::Ignore => {}
                }
            } else {
                self.pending = rest.to_vec();
            }
        }
        Ok(out)
    }

    fn getstate(&self) -> DecoderState {
        DecoderState {
            pending: self.pending.clone(),
            flags: 0,
        }
    }

    fn setstate(&mut self, state: DecoderState) -> StreamResult<()> {
        self.pending = state.pending;
        Ok(())
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

/// UTF-8 encoder. Total over `str`, so it never fails and holds no state.
#[derive(Debug, Default)]
pub struct Utf8Encoder;

impl IncrementalEncoder for Utf8Encoder {
    fn encode(&mut self, input: &str) -> StreamResult<Vec<u8>> {
        Ok(input.as_bytes().to_vec())
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sequences_carry_over_at_every_boundary() {
        let text = "héllo ☃";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
            let mut out = dec.decode(&bytes[..split], false).unwrap();
            out.push_str(&dec.decode(&bytes[split..], true).unwrap());
            assert_eq!(out, text, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_produces_chars_only_when_complete() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
        let snowman = "☃".as_bytes();
        assert_eq!(dec.decode(&snowman[..1], false).unwrap(), "");
        assert_eq!(dec.decode(&snowman[1..2], false).unwrap(), "");
        assert_eq!(dec.decode(&snowman[2..], false).unwrap(), "☃");
        assert!(dec.getstate().pending.is_empty());
    }

    #[test]
    fn strict_rejects_invalid_bytes_with_offset() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
        let err = dec.decode(b"ab\xffcd", false).unwrap_err();
        assert!(matches!(err, StreamError::Decode(_)));
        assert!(err.to_string().contains("0xff"));
        assert!(err.to_string().contains("offset 2"));
    }

    #[test]
    fn replace_substitutes_per_maximal_invalid_subpart() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Replace);
        // Two stray bytes: two replacements.
        assert_eq!(dec.decode(b"a\xff\xfeb", true).unwrap(), "a\u{FFFD}\u{FFFD}b");
        // One truncated sequence at eof: one replacement.
        let mut dec = Utf8Decoder::new(ErrorPolicy::Replace);
        assert_eq!(dec.decode(b"a\xe2\x82", true).unwrap(), "a\u{FFFD}");
    }

    #[test]
    fn ignore_drops_invalid_input() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Ignore);
        assert_eq!(dec.decode(b"a\xffb", true).unwrap(), "ab");
    }

    #[test]
    fn truncated_sequence_at_eof_is_an_error_under_strict() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
        assert_eq!(dec.decode(b"a\xe2\x82", false).unwrap(), "a");
        let err = dec.decode(b"", true).unwrap_err();
        assert!(matches!(err, StreamError::Decode(_)));
    }

    #[test]
    fn state_snapshot_restores_mid_sequence() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
        dec.decode(&"☃".as_bytes()[..2], false).unwrap();
        let state = dec.getstate();
        assert_eq!(state.pending.len(), 2);

        let mut fresh = Utf8Decoder::new(ErrorPolicy::Strict);
        fresh.setstate(state).unwrap();
        assert_eq!(fresh.decode(&"☃".as_bytes()[2..], false).unwrap(), "☃");
    }

    #[test]
    fn reset_discards_carry_over() {
        let mut dec = Utf8Decoder::new(ErrorPolicy::Strict);
        dec.decode(b"\xe2", false).unwrap();
        dec.reset();
        assert_eq!(dec.getstate(), DecoderState::default());
        assert_eq!(dec.decode(b"ok", true).unwrap(), "ok");
    }

    #[test]
    fn encoder_is_the_identity_on_utf8_bytes() {
        let mut enc = Utf8Encoder;
        assert_eq!(enc.encode("héllo ☃").unwrap(), "héllo ☃".as_bytes());
    }
}
