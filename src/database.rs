//! Database Facade (§4.1, §6.3) — the only in-scope surface: open a
//! `DwarfIdea` file read-only and look up keys against it.
//!
//! ```no_run
//! use dwarfidea::Database;
//!
//! let mut db = Database::open("cells.dwi", 4096, 512)?;
//! if let Some((coords, extra)) = db.lookup(&[0x00, 0x01, 0x02, 0x03])? {
//!     println!("{} {} -> {:?},{:?}", coords.lat, coords.lon, extra, db.max_dist_error());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! A thin facade over a parsed header and a reader: open validates and
//! caches nothing eagerly beyond the header itself, then every lookup
//! seeks, decodes on demand, and populates the instance-held caches.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::block::{decode_block_coords, decode_block_extra, decode_block_keys, Coords};
use crate::cache::{CoordsBuffer, CoordsCache, ExtraBuffer, ExtraCache, KeysBuffer, KeysCache, ResultCache};
use crate::error::{Error, FileFormatError};
use crate::header::{self, Header};
use crate::index::{find_block, walk_block_keys};
use crate::keymap::{map_key, KeyMapError};

/// Convenience builder over the frozen three-argument `Database::open`
/// signature; purely sugar over it, changes nothing about its behavior.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    pub results_cache_cap: usize,
    pub block_cache_cap: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            results_cache_cap: 4096,
            block_cache_cap: 512,
        }
    }
}

impl OpenOptions {
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Database, Error> {
        Database::open(path, self.results_cache_cap, self.block_cache_cap)
    }
}

pub struct Database {
    mmap: Mmap,
    parsed: header::ParsedHeader,
    results_cache: ResultCache,
    keys_cache: KeysCache,
    coords_cache: CoordsCache,
    extra_cache: ExtraCache,
}

impl Database {
    /// Open `path` read-only, parse the header, and allocate the result
    /// cache plus three block caches (keys, coords, extra-data), each of
    /// capacity `block_cache_cap`. Per §7, both I/O errors and
    /// file-format errors surface here (this is the one place they are
    /// allowed to).
    pub fn open<P: AsRef<Path>>(
        path: P,
        results_cache_cap: usize,
        block_cache_cap: usize,
    ) -> Result<Self, Error> {
        let file = File::open(path)?;
        // SAFETY: the file is opened read-only and is not expected to be
        // mutated by another process for the lifetime of this mapping;
        // this mirrors the read-only embedding contract documented on
        // `Database` as a whole.
        let mmap = unsafe { Mmap::map(&file)? };
        let parsed = header::parse(&mmap).map_err(Error::FileFormat)?;

        debug!(
            key_size = parsed.header.key_size,
            num_entries = parsed.header.num_entries,
            index_size = parsed.header.index_size,
            has_key_map = !parsed.header.key_map.prefixes.is_empty(),
            "opened DwarfIdea database"
        );

        Ok(Self {
            mmap,
            parsed,
            results_cache: ResultCache::new(results_cache_cap),
            keys_cache: KeysCache::new(block_cache_cap),
            coords_cache: CoordsCache::new(block_cache_cap),
            extra_cache: ExtraCache::new(block_cache_cap),
        })
    }

    pub fn max_dist_error(&self) -> f32 {
        self.parsed.header.max_dist_error
    }

    fn header(&self) -> &Header {
        &self.parsed.header
    }

    /// Look up `raw_key`. Returns `Ok(None)` for a negative lookup
    /// (including one caused by mid-lookup file-format corruption, which
    /// degrades silently per §4.1/§7); returns `Err(Error::InvalidKey)` if
    /// `raw_key`'s length does not match the header's `key_size`.
    pub fn lookup(&mut self, raw_key: &[u8]) -> Result<Option<(Coords, Option<Vec<u8>>)>, Error> {
        let expected = self.header().key_size as usize;
        if raw_key.len() != expected {
            return Err(Error::InvalidKey {
                expected,
                actual: raw_key.len(),
            });
        }

        if let Some(cached) = self.results_cache.get(raw_key) {
            return Ok(cached);
        }

        let result = match self.lookup_uncached(raw_key) {
            Ok(result) => result,
            Err(err) => {
                trace!(
                    key = %hex::encode(raw_key),
                    error = %err,
                    "block decode failed during lookup, treating as a miss"
                );
                None
            }
        };
        self.results_cache.put(raw_key.to_vec(), result);
        Ok(result)
    }

    fn lookup_uncached(
        &mut self,
        raw_key: &[u8],
    ) -> Result<Option<(Coords, Option<Vec<u8>>)>, FileFormatError> {
        let mapped_key = match map_key(raw_key, &self.header().key_map) {
            Ok(key) => key,
            Err(KeyMapError::UnknownPrefix) => return Ok(None),
        };

        let header = self.header().clone();
        if crate::index::compare_keys(&mapped_key, &header.last_key) == std::cmp::Ordering::Greater
        {
            return Ok(None);
        }

        let entry = match find_block(
            &self.mmap,
            header.index_offset,
            header.index_size,
            header.effective_key_size(),
            &mapped_key,
        )? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        // §4.1 steps 6-9: decode (and cache) the keys segment first and
        // walk it; only decode coords/extra-data — and only cache them —
        // once a row is actually found. A miss here never touches the
        // coords or extra-data segments at all.
        let keys = self.keys_buffer(entry.block_offset)?;
        let row = walk_block_keys(
            &keys.keys_blob,
            &entry.index_key,
            &mapped_key,
            keys.entry_count,
        )?;
        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let coords_buf = self.coords_buffer(entry.block_offset, keys.next_pos, keys.entry_count)?;
        let coords = coords_buf.coords[row];

        let extra = if header.extra_data_size > 0 {
            let extra_buf = self.extra_buffer(
                entry.block_offset,
                coords_buf.next_pos,
                keys.entry_count,
            )?;
            extra_buf.get(row).cloned()
        } else {
            None
        };

        Ok(Some((coords, extra)))
    }

    fn keys_buffer(&mut self, block_offset: u32) -> Result<KeysBuffer, FileFormatError> {
        if let Some(buffer) = self.keys_cache.get(block_offset) {
            return Ok(buffer);
        }
        let decoded = decode_block_keys(&self.mmap, block_offset as usize, &self.parsed.keys_fse_table)?;
        let buffer = KeysBuffer {
            keys_blob: Arc::new(decoded.keys_blob),
            entry_count: decoded.entry_count,
            next_pos: decoded.next_pos,
        };
        self.keys_cache.put(block_offset, buffer.clone());
        Ok(buffer)
    }

    fn coords_buffer(
        &mut self,
        block_offset: u32,
        pos: usize,
        entry_count: usize,
    ) -> Result<CoordsBuffer, FileFormatError> {
        if let Some(buffer) = self.coords_cache.get(block_offset) {
            return Ok(buffer);
        }
        let header = self.parsed.header.clone();
        let decoded = decode_block_coords(
            &self.mmap,
            pos,
            entry_count,
            &header,
            &self.parsed.coords_fse_table,
        )?;
        let buffer = CoordsBuffer {
            coords: Arc::new(decoded.coords),
            next_pos: decoded.next_pos,
        };
        self.coords_cache.put(block_offset, buffer.clone());
        Ok(buffer)
    }

    fn extra_buffer(
        &mut self,
        block_offset: u32,
        pos: usize,
        entry_count: usize,
    ) -> Result<ExtraBuffer, FileFormatError> {
        if let Some(buffer) = self.extra_cache.get(block_offset) {
            return Ok(buffer);
        }
        let header = self.parsed.header.clone();
        let extra_table = self
            .parsed
            .extra_fse_table
            .as_ref()
            .ok_or(FileFormatError::CorruptIndex)?;
        let rows = decode_block_extra(&self.mmap, pos, entry_count, &header, extra_table)?;
        let buffer: ExtraBuffer = Arc::new(rows);
        self.extra_cache.put(block_offset, buffer.clone());
        Ok(buffer)
    }

    /// Drop the memory mapping and caches. After this call the `Database`
    /// must not be used again; `Drop` would release the mapping regardless,
    /// but an explicit `close()` documents the intent at the call site.
    pub fn close(self) {
        drop(self);
    }
}
