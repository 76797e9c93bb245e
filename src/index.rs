//! Index Searcher (§4.5 block index binary search, §4.7 intra-block key
//! walk): a two-level search — binary-search a fixed-stride sorted index
//! to find the right block, then walk that block's delta-varint-encoded
//! keys from its anchor.

use crate::block::{read_block_index_entry, BlockIndexEntry};
use crate::error::FileFormatError;
use crate::varint::decode_delta;

/// Compare two equal-length keys as unsigned big-endian integers. For
/// fixed-width byte arrays this is exactly lexicographic byte comparison
/// (§9: shorter keys must be zero-extended on the high side before this
/// call if their widths ever differ).
pub fn compare_keys(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.cmp(b)
}

/// Binary search the block index for the block whose anchor key is the
/// largest index key `<= target`. Returns `None` if `target` sorts before
/// every index entry (no block can contain it).
pub fn find_block(
    file: &[u8],
    index_offset: u64,
    index_size: u32,
    effective_key_size: usize,
    target: &[u8],
) -> Result<Option<BlockIndexEntry>, FileFormatError> {
    let stride = effective_key_size + 4;
    let n = index_size as usize;
    if n == 0 {
        return Ok(None);
    }

    let mut lo: isize = 0;
    let mut hi: isize = n as isize - 1;
    let mut carry: Option<usize> = None;

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let pos = index_offset as usize + mid as usize * stride;
        let entry = read_block_index_entry(file, pos, effective_key_size)?;
        match compare_keys(&entry.index_key, target) {
            std::cmp::Ordering::Less | std::cmp::Ordering::Equal => {
                carry = Some(mid as usize);
                lo = mid + 1;
            }
            std::cmp::Ordering::Greater => {
                hi = mid - 1;
            }
        }
    }

    match carry {
        Some(idx) => {
            let pos = index_offset as usize + idx * stride;
            Ok(Some(read_block_index_entry(file, pos, effective_key_size)?))
        }
        None => Ok(None),
    }
}

/// Walk a block's decoded keys blob (concatenated unsigned delta-varints
/// relative to `anchor_key`), returning the row index of `target` if
/// present.
pub fn walk_block_keys(
    keys_blob: &[u8],
    anchor_key: &[u8],
    target: &[u8],
    entry_count: usize,
) -> Result<Option<usize>, FileFormatError> {
    let key_size = anchor_key.len();
    let mut current = key_to_u64(anchor_key);
    let mut pos = 0usize;

    for row in 0..entry_count {
        if row > 0 {
            let (delta, next_pos) = decode_delta(keys_blob, pos)?;
            pos = next_pos;
            current = current.wrapping_add(delta);
        }
        let candidate = u64_to_key(current, key_size);
        match compare_keys(&candidate, target) {
            std::cmp::Ordering::Equal => return Ok(Some(row)),
            std::cmp::Ordering::Greater => return Ok(None),
            std::cmp::Ordering::Less => continue,
        }
    }
    Ok(None)
}

fn key_to_u64(key: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let start = 8 - key.len().min(8);
    buf[start..].copy_from_slice(&key[key.len().saturating_sub(8)..]);
    u64::from_be_bytes(buf)
}

fn u64_to_key(value: u64, key_size: usize) -> Vec<u8> {
    let full = value.to_be_bytes();
    full[8 - key_size..].to_vec()
}
