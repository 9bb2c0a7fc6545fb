//! In-memory store for decoded tiles awaiting composition.
//!
//! Backed by `moka::sync::Cache`. Decoded tiles are large (a 256×256 tile is
//! 256 KiB of RGBA), so entries are weighed by their pixel bytes and the
//! least recently used tile is evicted once the budget is exceeded.
//!
//! Tiles are moved in and moved out: [`DecodedTileCache::take`] hands the
//! tile itself to the caller, so a tile never has two owners. moka needs
//! cloneable values, so each tile sits in a shared slot that `take` empties.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use parking_lot::Mutex;
use tracing::debug;

use super::traits::PurgeableCache;
use crate::decode::DecodedTile;
use crate::tile::TileSpec;

/// Default cache budget: 64 MiB (about 256 tiles of 256×256).
pub const DEFAULT_DECODE_CACHE_BYTES: usize = 64 * 1024 * 1024;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub purged: u64,
    pub entry_count: usize,
    pub size_bytes: usize,
}

/// Cache slot. `bytes` is fixed at insertion so the weigher never locks.
struct CachedTile {
    bytes: usize,
    tile: Mutex<Option<DecodedTile>>,
}

/// Byte-bounded cache of decoded tiles.
pub struct DecodedTileCache {
    cache: Cache<TileSpec, Arc<CachedTile>>,
    max_size_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
    purged: AtomicU64,
}

impl DecodedTileCache {
    /// Create a cache holding at most `max_size_bytes` of pixel data.
    pub fn new(max_size_bytes: usize) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let evicted = Arc::clone(&evictions);

        let cache = Cache::builder()
            .weigher(|_spec: &TileSpec, entry: &Arc<CachedTile>| -> u32 {
                entry.bytes.min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes as u64)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_spec, _entry, cause| {
                if cause == RemovalCause::Size {
                    evicted.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            cache,
            max_size_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
            purged: AtomicU64::new(0),
        }
    }

    /// Store a tile, replacing any tile with the same spec.
    ///
    /// Least recently used tiles are evicted until the new one fits. A tile
    /// larger than the whole budget is not stored; `false` is returned in
    /// that case.
    pub fn insert(&self, tile: DecodedTile) -> bool {
        let bytes = tile.byte_size();
        if bytes > self.max_size_bytes {
            debug!(tile = %tile.spec(), size = bytes, "Tile exceeds cache budget, not cached");
            return false;
        }

        let spec = tile.spec();
        let entry = CachedTile {
            bytes,
            tile: Mutex::new(Some(tile)),
        };
        self.cache.insert(spec, Arc::new(entry));
        // Apply evictions now so size and membership queries are exact.
        self.cache.run_pending_tasks();
        true
    }

    /// Move a tile out of the cache.
    pub fn take(&self, spec: &TileSpec) -> Option<DecodedTile> {
        let tile = self
            .cache
            .remove(spec)
            .and_then(|entry| entry.tile.lock().take());
        match tile {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        tile
    }

    /// Check if a tile is cached.
    pub fn contains(&self, spec: &TileSpec) -> bool {
        self.cache.contains_key(spec)
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current pixel bytes held.
    pub fn size_bytes(&self) -> usize {
        self.cache.run_pending_tasks();
        self.cache.weighted_size() as usize
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    /// Specs of all cached tiles, in no particular order.
    pub fn specs(&self) -> Vec<TileSpec> {
        self.cache.iter().map(|(spec, _)| *spec).collect()
    }

    /// Drop every cached tile.
    pub fn clear(&self) {
        for spec in self.specs() {
            self.cache.invalidate(&spec);
        }
        self.cache.run_pending_tasks();
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            purged: self.purged.load(Ordering::Relaxed),
            entry_count: self.len(),
            size_bytes: self.size_bytes(),
        }
    }
}

impl Default for DecodedTileCache {
    fn default() -> Self {
        Self::new(DEFAULT_DECODE_CACHE_BYTES)
    }
}

impl PurgeableCache for DecodedTileCache {
    fn purge_except(&self, keep: &HashSet<TileSpec>) -> usize {
        let doomed: Vec<TileSpec> = self
            .specs()
            .into_iter()
            .filter(|spec| !keep.contains(spec))
            .collect();

        for spec in &doomed {
            self.cache.invalidate(spec);
        }
        self.cache.run_pending_tasks();

        self.purged.fetch_add(doomed.len() as u64, Ordering::Relaxed);
        if !doomed.is_empty() {
            debug!(purged = doomed.len(), kept = self.len(), "Purged decode cache");
        }
        doomed.len()
    }
}

impl std::fmt::Debug for DecodedTileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedTileCache")
            .field("max_size_bytes", &self.max_size_bytes)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: u32, edge: u32) -> DecodedTile {
        DecodedTile::solid(TileSpec::new(1, 4, x, 0), edge, edge, [x as u8, 0, 0, 255]).unwrap()
    }

    #[test]
    fn test_insert_and_take() {
        let cache = DecodedTileCache::new(1024);
        assert!(cache.insert(tile(1, 4)));

        assert!(cache.contains(&TileSpec::new(1, 4, 1, 0)));
        assert_eq!(cache.size_bytes(), 64);

        let taken = cache.take(&TileSpec::new(1, 4, 1, 0)).unwrap();
        assert_eq!(taken.pixels()[0], 1);
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_take_missing_counts_miss() {
        let cache = DecodedTileCache::new(1024);
        assert!(cache.take(&TileSpec::new(0, 0, 0, 0)).is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_replacing_same_spec_keeps_size_consistent() {
        let cache = DecodedTileCache::new(1024);
        cache.insert(tile(1, 4));
        cache.insert(tile(1, 2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), 16);
    }

    #[test]
    fn test_oldest_evicted_when_over_budget() {
        // Each 4×4 tile is 64 bytes; budget fits two.
        let cache = DecodedTileCache::new(128);
        cache.insert(tile(1, 4));
        cache.insert(tile(2, 4));
        cache.insert(tile(3, 4));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&TileSpec::new(1, 4, 1, 0)));
        let specs: HashSet<TileSpec> = cache.specs().into_iter().collect();
        let expected: HashSet<TileSpec> =
            [TileSpec::new(1, 4, 2, 0), TileSpec::new(1, 4, 3, 0)].into_iter().collect();
        assert_eq!(specs, expected);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_taken_tile_is_not_evicted_later() {
        let cache = DecodedTileCache::new(128);
        cache.insert(tile(1, 4));
        cache.insert(tile(2, 4));
        assert!(cache.take(&TileSpec::new(1, 4, 1, 0)).is_some());

        // Room was freed by the take, so nothing is evicted.
        cache.insert(tile(3, 4));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.take(&TileSpec::new(1, 4, 1, 0)).is_none());
    }

    #[test]
    fn test_oversized_tile_rejected() {
        let cache = DecodedTileCache::new(32);
        assert!(!cache.insert(tile(1, 4)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_except_keeps_bound_tiles() {
        let cache = DecodedTileCache::new(1024);
        cache.insert(tile(1, 2));
        cache.insert(tile(2, 2));
        cache.insert(tile(3, 2));

        let keep: HashSet<TileSpec> = [TileSpec::new(1, 4, 2, 0)].into_iter().collect();
        assert_eq!(cache.purge_except(&keep), 2);

        assert_eq!(cache.specs(), vec![TileSpec::new(1, 4, 2, 0)]);
        assert_eq!(cache.stats().purged, 2);
        assert_eq!(cache.size_bytes(), 16);
    }

    #[test]
    fn test_clear() {
        let cache = DecodedTileCache::new(1024);
        cache.insert(tile(1, 2));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }
}
