//! Latin-1 (ISO-8859-1) codec. Every byte decodes to the code point of its
//! value, which makes the decoder total and byte-transparent; only encoding
//! can fall outside the domain (code points above U+00FF).

use crate::codec::{DecoderState, ErrorPolicy, IncrementalDecoder, IncrementalEncoder};
use crate::error::{StreamError, StreamResult};

/// Stateless, infallible Latin-1 decoder.
#[derive(Debug, Default)]
pub struct Latin1Decoder;

impl Latin1Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IncrementalDecoder for Latin1Decoder {
    fn decode(&mut self, input: &[u8], _eof: bool) -> StreamResult<String> {
        Ok(input.iter().map(|&byte| byte as char).collect())
    }

    fn getstate(&self) -> DecoderState {
        DecoderState::default()
    }

    fn setstate(&mut self, _state: DecoderState) -> StreamResult<()> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Stateless Latin-1 encoder.
#[derive(Debug)]
pub struct Latin1Encoder {
    policy: ErrorPolicy,
}

impl Latin1Encoder {
    #[must_use]
    pub fn new(policy: ErrorPolicy) -> Self {
        Self { policy }
    }
}

impl IncrementalEncoder for Latin1Encoder {
    fn encode(&mut self, input: &str) -> StreamResult<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        for (offset, ch) in input.chars().enumerate() {
            match u8::try_from(ch as u32) {
                Ok(byte) => out.push(byte),
                Err(_) => match self.policy {
                    ErrorPolicy::Strict => {
                        return Err(StreamError::Encode(format!(
                            "character U+{:04X} not encodable in latin-1 at offset {offset}",
                            ch as u32
                        )));
                    }
                    ErrorPolicy::Replace => out.push(b'?'),
                    ErrorPolicy::Ignore => {}
                },
            }
        }
        Ok(out)
    }

    fn reset(&mut self) {}
}
