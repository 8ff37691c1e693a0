//! # stratio-core
//!
//! Layered stream stack: buffered byte streams over pluggable raw
//! endpoints, with an incremental text layer on top.
//!
//! The layers compose bottom-up. A [`raw::RawStream`] moves bytes and
//! reports stalls and end-of-data explicitly; the [`buffered`] layer
//! amortizes raw transfers behind read-ahead and write coalescing; the
//! [`text`] layer decodes characters incrementally, recognizes line
//! terminators, and names logical positions with opaque reconstruction
//! tokens. No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod buffered;
pub mod codec;
pub mod error;
pub mod raw;
pub mod text;
