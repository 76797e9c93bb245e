//! # dwarfidea — read-only lookup engine for the DwarfIdea key→coordinate database
//!
//! Format guarantees (frozen at format version 1):
//! - All numeric fields are little-endian; the 9-byte signature is raw ASCII
//! - Every block is self-describing: an entry count, three independently
//!   transformed segments (keys, coordinates, optional extra data)
//! - The inverse transform pipeline per segment is fixed: FSE entropy decode
//!   (optional) → inverse ZRLT (optional) → inverse SBRT → inverse BWTS
//! - The block index is a fixed-stride, sorted array; lookups binary-search
//!   it, then walk the target block's delta-varint-encoded keys
//! - The database is opened once and mapped read-only for its entire
//!   lifetime; there is no write path and no incremental update

pub mod bitstream;
pub mod block;
pub mod cache;
pub mod database;
pub mod error;
pub mod fse;
pub mod header;
pub mod index;
pub mod keymap;
pub mod transform;
pub mod varint;

#[cfg(test)]
mod testsupport;

pub use block::Coords;
pub use database::{Database, OpenOptions};
pub use error::{Error, FileFormatError};
