//! ASCII codec. Single-byte, no carry-over; only bytes (and characters)
//! in 0x00..=0x7F are in domain.

use crate::codec::{DecoderState, ErrorPolicy, IncrementalDecoder, IncrementalEncoder, REPLACEMENT};
use crate::error::{StreamError, StreamResult};

/// Stateless ASCII decoder.
#[derive(Debug)]
pub struct AsciiDecoder {
    policy: ErrorPolicy,
}

impl AsciiDecoder {
    #[must_use]
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }
}

impl IncrementalDecoder for AsciiDecoder {
    fn decode(&mut self, input: &[u8], _eof: bool) -> StreamResult<String> {
        let mut out = String::with_capacity(input.len());
        for (offset, &byte) in input.iter().enumerate() {
            if byte.is_ascii() {
                out.push(byte as char);
            } else {
                match self.policy {
                    ErrorPolicy::Strict => {
                        return Err(StreamError::Decode(format!(
                            "byte 0x{byte:02x} outside ascii range at offset {offset}"
                        )));
                    }
                    ErrorPolicy::Replace => out.push(REPLACEMENT),
                    ErrorPolicy::Ignore => {}
                }
            }
        }
        Ok(out)
    }

    fn getstate(&self) -> DecoderState {
        DecoderState::default()
    }

    fn setstate(&mut self, _state: DecoderState) -> StreamResult<()> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Stateless ASCII encoder.
#[derive(Debug)]
pub struct AsciiEncoder {
    policy: ErrorPolicy,
}

impl AsciiEncoder {
    #[must_use]
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }
}

impl IncrementalEncoder for AsciiEncoder {
    fn encode(&mut self, input: &str) -> StreamResult<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        for (offset, ch) in input.chars().enumerate() {
            if ch.is_ascii() {
                out.push(ch as u8);
            } else {
                match self.policy {
                    ErrorPolicy::Strict => {
                        return Err(StreamError::Encode(format!(
                            "character U+{:04X} not encodable in ascii at offset {offset}",
                            ch as u32
                        )));
                    }
                    ErrorPolicy::Replace => out.push(b'?'),
                    ErrorPolicy::Ignore => {}
                }
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {}
}
