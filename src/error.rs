//! Error types.
//!
//! `FileFormatError` covers every way the on-disk bytes can fail to match
//! the format this crate decodes. `Error` wraps it alongside I/O failures
//! and caller-argument errors. Which variant a caller sees depends on where
//! the failure happened: `Database::open` surfaces both `Io` and
//! `FileFormat`; `Database::lookup` surfaces only `InvalidKey` and silently
//! degrades any `FileFormat` error encountered mid-lookup to `None` (a
//! corrupt block must not crash every subsequent, unrelated lookup).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file format error: {0}")]
    FileFormat(#[from] FileFormatError),

    #[error("invalid key: expected {expected} bytes, got {actual}")]
    InvalidKey { expected: usize, actual: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileFormatError {
    #[error("invalid signature — not a DwarfIdea database")]
    InvalidSignature,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),

    #[error("header truncated: needed at least {needed} bytes, file has {available}")]
    TruncatedHeader { needed: usize, available: usize },

    #[error("malformed FSE table: {0}")]
    MalformedFseTable(&'static str),

    #[error("bit stream exhausted before the expected number of symbols were decoded")]
    BitStreamExhausted,

    #[error("bit stream end-mark missing (last byte of block segment is zero)")]
    MissingEndMark,

    #[error("inverse transform failed: {0}")]
    InverseTransformFailed(&'static str),

    #[error("varint overflow while decoding {0}")]
    VarIntOverflow(&'static str),

    #[error("block index is not sorted or has an invalid stride")]
    CorruptIndex,

    #[error("block offset {offset} is out of bounds (file is {file_len} bytes)")]
    BlockOutOfBounds { offset: u64, file_len: u64 },
}
