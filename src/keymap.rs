//! Key Mapper (§4.6) — the cellular-style prefix remapping case.
//!
//! Raw lookup keys in this shape are 4 raw prefix bytes (e.g. MCC+MNC)
//! followed by the rest of the key. When the header carries a non-empty
//! key map, every lookup first remaps the 4-byte prefix to its 2-byte id
//! via `KeyMap::lookup`, shrinking the effective key used for the index
//! and block search by two bytes. Only this exact 4→2 byte layout is
//! implemented; generalizing it is explicitly out of scope (§9).

use crate::header::KeyMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMapError {
    /// The 4-byte prefix of the raw key has no entry in the key map — the
    /// key cannot exist in this database (not a format error, a plain
    /// negative lookup).
    UnknownPrefix,
}

/// Remap `raw_key` using `key_map`, producing the effective key used for
/// index search. If `key_map` is empty, `raw_key` is returned unchanged.
pub fn map_key(raw_key: &[u8], key_map: &KeyMap) -> Result<Vec<u8>, KeyMapError> {
    if key_map.prefixes.is_empty() {
        return Ok(raw_key.to_vec());
    }
    debug_assert!(raw_key.len() >= 4);
    let prefix = u32::from_be_bytes(raw_key[0..4].try_into().unwrap());
    let mapped_id = key_map.lookup(prefix).ok_or(KeyMapError::UnknownPrefix)?;

    let mut mapped = Vec::with_capacity(raw_key.len() - 4 + 2);
    mapped.extend_from_slice(&mapped_id.to_be_bytes());
    mapped.extend_from_slice(&raw_key[4..]);
    Ok(mapped)
}
