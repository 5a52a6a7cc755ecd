//! Sharded LRU cache.
//!
//! Thin routing layer over a fixed, power-of-two array of independently
//! locked [`LruShard`]s. Each operation hashes the key once, selects a
//! shard by the hash's high bits, and forwards the operation together with
//! the hash; the shard reuses it for bucket selection and comparison
//! tiebreaks. Sharding exists purely to cut lock contention; all caching
//! semantics live in the shard.
//!
//! ```text
//!   insert/lookup/erase(key)
//!          │ hash = bytes_hash(key)
//!          ▼
//!   shards[hash >> (32 - shard_bits)]  ──►  LruShard operation
//! ```
//!
//! The per-shard capacity is `ceil(total / shards)`. A separate small
//! mutex feeds `new_id`; `prune` and `total_charge` visit shards one at a
//! time without any cache-wide lock.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ds::shard::{bytes_hash, shard_index};
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::lru::{CacheHandle, LruShard};
use crate::traits::{Cache, DeleterFn};

/// Default number of shard-selector bits (16 shards).
pub const DEFAULT_SHARD_BITS: u32 = 4;

/// Largest supported shard-selector bit count (256 shards).
pub const MAX_SHARD_BITS: u32 = 8;

/// Concurrent LRU cache split into independently locked shards.
///
/// The only built-in implementation of [`Cache`]. Construct through
/// [`new_lru_cache`], [`ShardedLruCache::new`], or the
/// [`CacheBuilder`](crate::builder::CacheBuilder).
pub struct ShardedLruCache<V> {
    shards: Box<[Arc<LruShard<V>>]>,
    shard_bits: u32,
    last_id: Mutex<u64>,
}

impl<V> ShardedLruCache<V> {
    /// Creates a cache with the given total capacity and the default shard
    /// count.
    pub fn new(capacity: usize) -> Self {
        Self::with_shard_bits(capacity, DEFAULT_SHARD_BITS)
    }

    /// Creates a cache with `1 << shard_bits` shards, splitting `capacity`
    /// evenly (rounding up) across them.
    ///
    /// # Panics
    ///
    /// Panics if `shard_bits > MAX_SHARD_BITS`. Use the builder for
    /// validated construction.
    pub fn with_shard_bits(capacity: usize, shard_bits: u32) -> Self {
        assert!(
            shard_bits <= MAX_SHARD_BITS,
            "shard_bits must be at most {MAX_SHARD_BITS}"
        );
        let shards = 1usize << shard_bits;
        let per_shard = capacity.div_ceil(shards);
        Self {
            shards: (0..shards)
                .map(|_| Arc::new(LruShard::new(per_shard)))
                .collect(),
            shard_bits,
            last_id: Mutex::new(0),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for(&self, hash: u32) -> &Arc<LruShard<V>> {
        &self.shards[shard_index(hash, self.shard_bits)]
    }

    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for (index, shard) in self.shards.iter().enumerate() {
            shard.check_invariants().map_err(|err| err.in_shard(index))?;
        }
        Ok(())
    }
}

impl<V: Send + Sync + 'static> Cache<V> for ShardedLruCache<V> {
    fn insert(&self, key: &[u8], value: V, charge: usize, deleter: DeleterFn<V>) -> CacheHandle<V> {
        let hash = bytes_hash(key);
        LruShard::insert(self.shard_for(hash), key, hash, value, charge, deleter)
    }

    fn lookup(&self, key: &[u8]) -> Option<CacheHandle<V>> {
        let hash = bytes_hash(key);
        LruShard::lookup(self.shard_for(hash), key, hash)
    }

    fn release(&self, handle: CacheHandle<V>) {
        drop(handle);
    }

    fn erase(&self, key: &[u8]) {
        let hash = bytes_hash(key);
        self.shard_for(hash).erase(key, hash);
    }

    fn new_id(&self) -> u64 {
        let mut last_id = self.last_id.lock();
        *last_id += 1;
        *last_id
    }

    fn prune(&self) {
        for shard in self.shards.iter() {
            shard.prune();
        }
    }

    fn total_charge(&self) -> usize {
        self.shards.iter().map(|shard| shard.total_charge()).sum()
    }
}

#[cfg(feature = "metrics")]
impl<V> MetricsSnapshotProvider<CacheMetricsSnapshot> for ShardedLruCache<V> {
    fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        let mut snapshot = CacheMetricsSnapshot::default();
        for shard in self.shards.iter() {
            shard.merge_metrics(&mut snapshot);
        }
        snapshot
    }
}

impl<V> fmt::Debug for ShardedLruCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

/// Creates a sharded LRU cache with the given total capacity.
pub fn new_lru_cache<V: Send + Sync + 'static>(capacity: usize) -> ShardedLruCache<V> {
    ShardedLruCache::new(capacity)
}
