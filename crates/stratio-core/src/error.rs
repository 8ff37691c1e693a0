//! Error taxonomy shared by every layer of the stack.
//!
//! Callers must be able to tell apart "this stream cannot do that"
//! (`Unsupported`), "this stream is gone" (`Closed`), "nothing is wrong but
//! the raw side cannot make progress right now" (`WouldBlock`), and a raw
//! implementation breaking its contract (`Invariant`). Read paths report
//! would-block through [`crate::buffered::ReadOutcome`] instead of an error;
//! the `WouldBlock` variant here is the write-side partial-progress carrier.

use thiserror::Error;

/// Result alias used across the crate.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors surfaced by raw, buffered, and text layers.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream does not support the requested operation, either
    /// permanently (writing to a read-only stream) or in its current state
    /// (telling while line iteration is in progress).
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The stream has been closed and can no longer be used.
    #[error("operation on closed stream")]
    Closed,

    /// A non-blocking raw stream stopped accepting bytes mid-operation.
    /// `accepted` is how many of the caller's bytes were taken before the
    /// stall; the caller owns the rest and may retry with them.
    #[error("raw stream would block after accepting {accepted} bytes")]
    WouldBlock { accepted: usize },

    /// A position token could not be honored against the stream's current
    /// contents, or a logical position could not be reconstructed.
    #[error("cannot reconstruct stream position: {0}")]
    MalformedPosition(String),

    /// Byte input could not be decoded under the configured policy.
    #[error("decode error: {0}")]
    Decode(String),

    /// Character input could not be encoded under the configured policy.
    #[error("encode error: {0}")]
    Encode(String),

    /// A raw stream violated its contract (accepted zero bytes from a
    /// non-empty write, over-reported progress). Not retryable.
    #[error("raw stream contract violation: {0}")]
    Invariant(&'static str),

    /// Operating-system failure reported by a raw stream.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True for the would-block signal, regardless of partial progress.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, StreamError::WouldBlock { .. })
    }

    /// Bytes accepted before a would-block stall, if this is one.
    #[must_use]
    pub fn accepted(&self) -> Option<usize> {
        match self {
            StreamError::WouldBlock { accepted } => Some(*accepted),
            _ => None,
        }
    }
}
