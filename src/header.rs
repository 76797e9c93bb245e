//! File Header (§6.1) — format anchor at offset 0.
//!
//! ```text
//! Offset  Size  Field
//!    0      9   signature          = "DwarfIdea" (9 ASCII bytes, not LE)
//!    9      2   version            = 1  (LE u16)
//!   11      2   key_size           raw key length, before mapping (LE u16)
//!   13      2   extra_data_size    (LE u16)
//!   15      4   num_entries        (LE u32)
//!   19      4   index_size         number of block index entries (LE u32)
//!   23      2   min_entries_per_block (LE u16)
//!   25      2   max_entries_per_block (LE u16)
//!   27      2   bounding_box_bits  (LE u16)
//!   29      4   max_dist_error     (LE f32)
//!   33      2   key_map_size       0, or number of mapped prefixes (LE u16)
//!   ...   4×N   key_map entries (LE u32 each), only if key_map_size > 0
//!   ...    ...  last_key (effective_key_size raw bytes)
//!   ...    ...  keys FSE table, coords FSE table, extra-data FSE table
//!                (only if extra_data_size > 0)
//!   ...    ...  block index (index_size entries), then blocks
//! ```
//!
//! All numeric fields are little-endian; the signature is nine raw ASCII
//! bytes. Version is frozen at 1 — any other value is rejected outright
//! (S5), as is any signature not byte-identical to `SIGNATURE` (S4).

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::FileFormatError;
use crate::fse::FseTable;

pub const SIGNATURE: &[u8; 9] = b"DwarfIdea";
pub const FORMAT_VERSION: u16 = 1;
pub const FIXED_HEADER_SIZE: usize = 35;

/// §4.6: the cellular key-mapping case, a 4-byte raw prefix mapped to a
/// 16-bit id, reducing the effective key size from `key_size` to
/// `key_size - 2` for index/block purposes.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    /// Stored (and read from the file) in insertion order, not sorted order;
    /// a prefix's position in this vector *is* its mapped id (§4.6 byte
    /// layout).
    pub prefixes: Vec<u32>,
}

impl KeyMap {
    pub fn lookup(&self, prefix: u32) -> Option<u16> {
        self.prefixes
            .iter()
            .position(|&p| p == prefix)
            .map(|idx| idx as u16)
    }
}

#[derive(Debug, Clone)]
pub struct Header {
    pub key_size: u16,
    pub extra_data_size: u16,
    pub num_entries: u32,
    pub index_size: u32,
    pub min_entries_per_block: u16,
    pub max_entries_per_block: u16,
    pub bounding_box_bits: u16,
    pub max_dist_error: f32,
    pub key_map: KeyMap,
    pub last_key: Vec<u8>,
    /// Byte offset, within the file, where the block index begins.
    pub index_offset: u64,
}

pub struct ParsedHeader {
    pub header: Header,
    pub keys_fse_table: FseTable,
    pub coords_fse_table: FseTable,
    pub extra_fse_table: Option<FseTable>,
}

impl Header {
    /// Effective (post key-mapping) key length used for index strides and
    /// intra-block key comparisons.
    pub fn effective_key_size(&self) -> usize {
        if self.key_map.prefixes.is_empty() {
            self.key_size as usize
        } else {
            self.key_size as usize - 2
        }
    }

    pub fn block_index_stride(&self) -> usize {
        self.effective_key_size() + 4
    }
}

/// Parse the full header, key map, last key, and the three FSE tables.
pub fn parse(buf: &[u8]) -> Result<ParsedHeader, FileFormatError> {
    if buf.len() < FIXED_HEADER_SIZE {
        return Err(FileFormatError::TruncatedHeader {
            needed: FIXED_HEADER_SIZE,
            available: buf.len(),
        });
    }
    if &buf[0..9] != SIGNATURE {
        return Err(FileFormatError::InvalidSignature);
    }

    let mut cursor = Cursor::new(&buf[9..FIXED_HEADER_SIZE]);
    let version = cursor.read_u16::<LittleEndian>().unwrap();
    if version != FORMAT_VERSION {
        return Err(FileFormatError::UnsupportedVersion(version));
    }
    let key_size = cursor.read_u16::<LittleEndian>().unwrap();
    let extra_data_size = cursor.read_u16::<LittleEndian>().unwrap();
    let num_entries = cursor.read_u32::<LittleEndian>().unwrap();
    let index_size = cursor.read_u32::<LittleEndian>().unwrap();
    let min_entries_per_block = cursor.read_u16::<LittleEndian>().unwrap();
    let max_entries_per_block = cursor.read_u16::<LittleEndian>().unwrap();
    let bounding_box_bits = cursor.read_u16::<LittleEndian>().unwrap();
    let max_dist_error = cursor.read_f32::<LittleEndian>().unwrap();
    let key_map_size = cursor.read_u16::<LittleEndian>().unwrap() as usize;

    let mut pos = FIXED_HEADER_SIZE;

    let key_map_bytes = key_map_size * 4;
    if buf.len() < pos + key_map_bytes {
        return Err(FileFormatError::TruncatedHeader {
            needed: pos + key_map_bytes,
            available: buf.len(),
        });
    }
    let mut prefixes = Vec::with_capacity(key_map_size);
    for i in 0..key_map_size {
        let start = pos + i * 4;
        let v = u32::from_le_bytes(buf[start..start + 4].try_into().unwrap());
        prefixes.push(v);
    }
    pos += key_map_bytes;

    let effective_key_size = if key_map_size > 0 {
        key_size as usize - 2
    } else {
        key_size as usize
    };
    if buf.len() < pos + effective_key_size {
        return Err(FileFormatError::TruncatedHeader {
            needed: pos + effective_key_size,
            available: buf.len(),
        });
    }
    let last_key = buf[pos..pos + effective_key_size].to_vec();
    pos += effective_key_size;

    let (keys_fse_table, next_pos) = FseTable::read(buf, pos)?;
    pos = next_pos;
    let (coords_fse_table, next_pos) = FseTable::read(buf, pos)?;
    pos = next_pos;
    let extra_fse_table = if extra_data_size > 0 {
        let (table, next_pos) = FseTable::read(buf, pos)?;
        pos = next_pos;
        Some(table)
    } else {
        None
    };

    let header = Header {
        key_size,
        extra_data_size,
        num_entries,
        index_size,
        min_entries_per_block,
        max_entries_per_block,
        bounding_box_bits,
        max_dist_error,
        key_map: KeyMap { prefixes },
        last_key,
        index_offset: pos as u64,
    };

    Ok(ParsedHeader {
        header,
        keys_fse_table,
        coords_fse_table,
        extra_fse_table,
    })
}
