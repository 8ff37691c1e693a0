//! Newline-normalizing decorator over an inner incremental decoder.
//!
//! The one invariant everything else leans on: a `"\r\n"` split across two
//! chunks is never surfaced as two pieces. A chunk ending in `'\r'` has
//! that character withheld (`pending_cr`) and re-emitted in front of the
//! next call's output, so downstream line scanning sees each terminator
//! whole. The withheld flag travels in bit 0 of the state flag word, with
//! the inner decoder's flags shifted up one bit.

use crate::codec::{DecoderState, IncrementalDecoder};
use crate::error::StreamResult;

/// Which terminator styles have been observed since construction or the
/// last `reset`. Styles accumulate; a file mixing all three reports all
/// three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewlineSeen {
    pub lf: bool,
    pub cr: bool,
    pub crlf: bool,
}

impl NewlineSeen {
    /// True once any terminator has been observed.
    #[must_use]
    pub fn any(self) -> bool {
        self.lf || self.cr || self.crlf
    }
}

/// Decoder decorator that recognizes `"\n"`, `"\r"`, and `"\r\n"`,
/// optionally translating all three to `"\n"`.
pub struct NewlineDecoder {
    inner: Box<dyn IncrementalDecoder>,
    translate: bool,
    pending_cr: bool,
    seen: NewlineSeen,
}

impl NewlineDecoder {
    #[must_use]
    pub fn new(inner: Box<dyn IncrementalDecoder>, translate: bool) -> Self {
        Self {
            inner,
            translate,
            pending_cr: false,
            seen: NewlineSeen::default(),
        }
    }

    /// Terminator styles observed so far.
    #[must_use]
    pub fn newlines_seen(&self) -> NewlineSeen {
        self.seen
    }
}

impl IncrementalDecoder for NewlineDecoder {
    fn decode(&mut self, input: &[u8], eof: bool) -> StreamResult<String> {
        let mut out = self.inner.decode(input, eof)?;
        if self.pending_cr && (!out.is_empty() || eof) {
            out.insert(0, '\r');
            self.pending_cr = false;
        }
        // Withhold a trailing CR: the next chunk may open with LF.
        if !eof && out.ends_with('\r') {
            out.pop();
            self.pending_cr = true;
        }

        // Count CRLF first so the lone counts can subtract it.
        let crlf = out.matches("\r\n").count();
        let cr = out.matches('\r').count() - crlf;
        let lf = out.matches('\n').count() - crlf;
        self.seen.crlf |= crlf > 0;
        self.seen.cr |= cr > 0;
        self.seen.lf |= lf > 0;

        if self.translate {
            if crlf > 0 {
                out = out.replace("\r\n", "\n");
            }
            if cr > 0 {
                out = out.replace('\r', "\n");
            }
        }
        Ok(out)
    }

    fn getstate(&self) -> DecoderState {
        let mut state = self.inner.getstate();
        state.flags = (state.flags << 1) | u64::from(self.pending_cr);
        state
    }

    fn setstate(&mut self, state: DecoderState) -> StreamResult<()> {
        self.pending_cr = state.flags & 1 != 0;
        self.inner.setstate(DecoderState {
            pending: state.pending,
            flags: state.flags >> 1,
        })
    }

    fn reset(&mut self) {
        self.pending_cr = false;
        self.seen = NewlineSeen::default();
        self.inner.reset();
    }
}
