//! Text layer: decoding, newline handling, and opaque positions.
//!
//! [`TextStream`] wraps any [`crate::buffered::ByteStream`] and serves
//! characters instead of bytes. Construction is configured by
//! [`TextConfig`]: which codec, what to do with undecodable input, and how
//! line terminators are recognized and produced.

mod position;
mod stream;

pub use position::{TextPosition, TextSeek};
pub use stream::{Lines, TextStream};

use crate::codec::{Encoding, ErrorPolicy};

/// A concrete line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    Lf,
    Cr,
    CrLf,
}

impl Terminator {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Terminator::Lf => "\n",
            Terminator::Cr => "\r",
            Terminator::CrLf => "\r\n",
        }
    }
}

/// How line terminators are recognized on read and produced on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NewlineMode {
    /// Recognize `\n`, `\r`, and `\r\n`, normalizing all three to `\n` in
    /// decoded text; written `\n` becomes the platform terminator.
    #[default]
    Universal,
    /// Recognize all three terminators without normalizing them; writes go
    /// out untouched.
    Preserve,
    /// Recognize exactly one terminator and nothing else; written `\n`
    /// becomes that terminator.
    Exact(Terminator),
}

impl NewlineMode {
    /// Map the conventional textual newline argument: absent means
    /// universal, empty means preserve, and the three literal terminators
    /// select exact mode. Anything else is rejected.
    #[must_use]
    pub fn parse(arg: Option<&str>) -> Option<NewlineMode> {
        match arg {
            None => Some(NewlineMode::Universal),
            Some("") => Some(NewlineMode::Preserve),
            Some("\n") => Some(NewlineMode::Exact(Terminator::Lf)),
            Some("\r") => Some(NewlineMode::Exact(Terminator::Cr)),
            Some("\r\n") => Some(NewlineMode::Exact(Terminator::CrLf)),
            Some(_) => None,
        }
    }

    /// Whether decoded text has terminators normalized to `\n`.
    pub(crate) fn read_translate(self) -> bool {
        matches!(self, NewlineMode::Universal)
    }

    /// Whether the read side wraps its codec in a newline decoder.
    pub(crate) fn read_wrapped(self) -> bool {
        matches!(self, NewlineMode::Universal | NewlineMode::Preserve)
    }

    /// What a written `\n` turns into; `None` leaves it alone.
    pub(crate) fn write_terminator(self) -> Option<&'static str> {
        match self {
            NewlineMode::Universal => {
                if cfg!(windows) {
                    Some("\r\n")
                } else {
                    None
                }
            }
            NewlineMode::Preserve | NewlineMode::Exact(Terminator::Lf) => None,
            NewlineMode::Exact(term) => Some(term.as_str()),
        }
    }
}

/// Construction-time configuration for [`TextStream`].
#[derive(Debug, Clone, Copy)]
pub struct TextConfig {
    pub encoding: Encoding,
    pub policy: ErrorPolicy,
    pub newline: NewlineMode,
    /// Flush the byte layer whenever written text carried a terminator.
    pub line_buffering: bool,
    /// Flush the byte layer after every write.
    pub write_through: bool,
    /// Bytes requested from the byte layer per decode step.
    pub chunk_size: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            policy: ErrorPolicy::Strict,
            newline: NewlineMode::Universal,
            line_buffering: false,
            write_through: false,
            chunk_size: 8192,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_maps_the_conventional_arguments() {
        assert_eq!(NewlineMode::parse(None), Some(NewlineMode::Universal));
        assert_eq!(NewlineMode::parse(Some("")), Some(NewlineMode::Preserve));
        assert_eq!(
            NewlineMode::parse(Some("\r\n")),
            Some(NewlineMode::Exact(Terminator::CrLf))
        );
        assert_eq!(NewlineMode::parse(Some("\r \n")), None);
        assert_eq!(NewlineMode::parse(Some("x")), None);
    }

    #[test]
    fn only_exact_modes_rewrite_written_lf() {
        assert_eq!(
            NewlineMode::Exact(Terminator::CrLf).write_terminator(),
            Some("\r\n")
        );
        assert_eq!(
            NewlineMode::Exact(Terminator::Cr).write_terminator(),
            Some("\r")
        );
        assert_eq!(NewlineMode::Exact(Terminator::Lf).write_terminator(), None);
        assert_eq!(NewlineMode::Preserve.write_terminator(), None);
    }

    #[test]
    fn default_config_is_strict_utf8_universal() {
        let config = TextConfig::default();
        assert_eq!(config.encoding, Encoding::Utf8);
        assert_eq!(config.policy, ErrorPolicy::Strict);
        assert_eq!(config.newline, NewlineMode::Universal);
        assert!(!config.line_buffering && !config.write_through);
    }
}
