//! Bounded in-memory tile cache with strict LRU eviction.
//!
//! Built on [`lru::LruCache`]: `get` promotes an entry, while `peek` and
//! `contains` leave recency alone. Entries never read after insertion keep
//! their insertion order, so the oldest untouched tile goes first.
//!
//! The cache is not internally synchronized. The loader keeps it behind the
//! same lock as its in-flight set.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use thiserror::Error;
use tracing::{debug, trace};

use super::stats::CacheStats;
use crate::coord::{TileKey, ZoomRange};
use crate::tile::TileRecord;

/// Default number of tiles kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Errors from cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Capacity must hold at least one tile
    #[error("Invalid cache capacity {0}: must be at least 1")]
    InvalidCapacity(usize),
}

/// Capacity-bounded tile store keyed by [`TileKey`].
pub struct TileCache {
    entries: LruCache<TileKey, TileRecord>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl TileCache {
    /// Create a new cache holding at most `capacity` tiles.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::InvalidCapacity(capacity))?;
        Ok(Self::with_capacity(capacity))
    }

    fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up a tile, refreshing its recency on a hit.
    ///
    /// This is the only operation that counts hits and misses.
    pub fn get(&mut self, key: &TileKey) -> Option<&TileRecord> {
        match self.entries.get_mut(key) {
            Some(record) => {
                self.hits += 1;
                record.touch();
                trace!(tile = %key, "Tile cache hit");
                Some(&*record)
            }
            None => {
                self.misses += 1;
                trace!(tile = %key, "Tile cache miss");
                None
            }
        }
    }

    /// Look up a tile without touching recency or counters.
    pub fn peek(&self, key: &TileKey) -> Option<&TileRecord> {
        self.entries.peek(key)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains(key)
    }

    /// Insert or replace a tile, evicting the least recently used one when
    /// full.
    ///
    /// Returns the keys evicted by this insertion.
    pub fn put(&mut self, record: TileRecord) -> Vec<TileKey> {
        let key = record.key;
        match self.entries.push(key, record) {
            Some((evicted, _)) if evicted != key => {
                self.evictions += 1;
                debug!(tile = %evicted, "Evicted least recently used tile");
                vec![evicted]
            }
            _ => Vec::new(),
        }
    }

    /// Remove a single tile.
    pub fn remove(&mut self, key: &TileKey) -> Option<TileRecord> {
        self.entries.pop(key)
    }

    /// Remove every tile. Hit and miss counters are kept.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(removed = count, "Tile cache cleared");
    }

    /// Run the eviction pass manually. Idempotent when within capacity.
    pub fn cleanup(&mut self) -> usize {
        self.evict_down_to(self.entries.cap().get()).len()
    }

    /// Change the capacity, evicting immediately if the cache is now too big.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<TileKey>, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::InvalidCapacity(capacity))?;
        let evicted = self.evict_down_to(capacity.get());
        self.entries.resize(capacity);
        Ok(evicted)
    }

    /// Drop every tile whose zoom is outside `range`.
    pub fn retain_zooms(&mut self, range: ZoomRange) -> usize {
        let doomed: Vec<TileKey> = self
            .entries
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| !range.contains(key.zoom))
            .collect();
        for key in &doomed {
            self.entries.pop(key);
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), ?range, "Pruned tiles outside zoom range");
        }
        doomed.len()
    }

    fn evict_down_to(&mut self, limit: usize) -> Vec<TileKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > limit {
            let Some((key, _)) = self.entries.pop_lru() else {
                break;
            };
            self.evictions += 1;
            debug!(tile = %key, "Evicted least recently used tile");
            evicted.push(key);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Total evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys ordered from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<TileKey> {
        self.entries.iter().rev().map(|(key, _)| *key).collect()
    }

    /// Cache-only statistics; `loading_tiles` is always zero here.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_tiles: self.entries.len(),
            loaded_tiles: self
                .entries
                .iter()
                .filter(|(_, record)| record.is_loaded())
                .count(),
            loading_tiles: 0,
            hits: self.hits,
            misses: self.misses,
            stored_tiles: None,
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::with_capacity(capacity)
    }
}

impl fmt::Debug for TileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.entries.cap())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .field("evictions", &self.evictions)
            .finish()
    }
}
