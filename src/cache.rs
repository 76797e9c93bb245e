//! LRU Caches (§4.9) — a per-key result cache plus three independent
//! per-block decoded-segment caches (keys, coords, extra-data), all
//! bounded with access-order eviction via the `lru` crate. `LruCache::new`
//! already guarantees a `put` never leaves the map above capacity (§9
//! "capacity is the post-insert cap"), so no extra bookkeeping is needed
//! here.
//!
//! The three block caches are kept separate, not bundled into one
//! combined buffer, so that a lookup whose key walk misses (or whose
//! coords/extra-data segment is corrupt) never has to populate — or be
//! blocked by — anything beyond the keys cache (§4.1 steps 6-9).

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::block::Coords;

/// One cached lookup outcome: `None` is a legitimate cached value (negative
/// caching, §8 property 6) distinct from "not yet cached".
pub type CachedResult = Option<(Coords, Option<Vec<u8>>)>;

pub struct ResultCache {
    inner: LruCache<Vec<u8>, CachedResult>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: LruCache::new(cap),
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Option<CachedResult> {
        self.inner.get(key).cloned()
    }

    pub fn put(&mut self, key: Vec<u8>, value: CachedResult) {
        self.inner.put(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A decoded keys segment, shared via `Arc` so a cache hit never re-copies
/// the blob. `next_pos` is the file offset of the coords segment that
/// follows this block's keys segment.
#[derive(Clone)]
pub struct KeysBuffer {
    pub keys_blob: Arc<Vec<u8>>,
    pub entry_count: usize,
    pub next_pos: usize,
}

/// A decoded coords segment, shared via `Arc`. `next_pos` is the file
/// offset of the (optional) extra-data segment that follows.
#[derive(Clone)]
pub struct CoordsBuffer {
    pub coords: Arc<Vec<Coords>>,
    pub next_pos: usize,
}

/// A decoded extra-data segment, shared via `Arc`.
pub type ExtraBuffer = Arc<Vec<Vec<u8>>>;

macro_rules! block_cache {
    ($name:ident, $value:ty) => {
        pub struct $name {
            inner: LruCache<u32, $value>,
        }

        impl $name {
            pub fn new(capacity: usize) -> Self {
                let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
                Self {
                    inner: LruCache::new(cap),
                }
            }

            pub fn get(&mut self, block_offset: u32) -> Option<$value> {
                self.inner.get(&block_offset).cloned()
            }

            pub fn put(&mut self, block_offset: u32, value: $value) {
                self.inner.put(block_offset, value);
            }

            pub fn len(&self) -> usize {
                self.inner.len()
            }
        }
    };
}

block_cache!(KeysCache, KeysBuffer);
block_cache!(CoordsCache, CoordsBuffer);
block_cache!(ExtraCache, ExtraBuffer);
