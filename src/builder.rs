//! Validated cache construction.
//!
//! [`CacheBuilder`] collects the tuning knobs of the sharded LRU cache and
//! validates them before construction. The direct constructors on
//! [`ShardedLruCache`] assert the same bounds; the builder reports them as
//! [`ConfigError`]s instead.
//!
//! ## Example
//!
//! ```rust
//! use refcache::builder::CacheBuilder;
//! use refcache::traits::Cache;
//!
//! let cache = CacheBuilder::new(64 * 1024)
//!     .shard_bits(2)
//!     .build::<String>();
//!
//! let handle = cache.insert(b"key", "value".to_string(), 5, Box::new(|_, _| {}));
//! assert_eq!(handle.value(), "value");
//! ```

use crate::error::ConfigError;
use crate::policy::sharded::{ShardedLruCache, DEFAULT_SHARD_BITS, MAX_SHARD_BITS};

/// Builder for [`ShardedLruCache`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: usize,
    shard_bits: u32,
}

impl CacheBuilder {
    /// Starts a builder for a cache with the given total charge capacity.
    ///
    /// Capacity 0 is valid and disables caching: inserts return usable
    /// handles but entries are never retained.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shard_bits: DEFAULT_SHARD_BITS,
        }
    }

    /// Sets the number of shard-selector bits; the cache holds
    /// `1 << shard_bits` shards. 0 means a single shard.
    pub fn shard_bits(mut self, shard_bits: u32) -> Self {
        self.shard_bits = shard_bits;
        self
    }

    /// Builds the cache, validating the configuration.
    pub fn try_build<V: Send + Sync + 'static>(&self) -> Result<ShardedLruCache<V>, ConfigError> {
        if self.shard_bits > MAX_SHARD_BITS {
            return Err(ConfigError::ShardBitsOutOfRange {
                requested: self.shard_bits,
                max: MAX_SHARD_BITS,
            });
        }
        Ok(ShardedLruCache::with_shard_bits(
            self.capacity,
            self.shard_bits,
        ))
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; use [`try_build`] to handle
    /// validation errors.
    ///
    /// [`try_build`]: CacheBuilder::try_build
    pub fn build<V: Send + Sync + 'static>(&self) -> ShardedLruCache<V> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("invalid cache configuration: {err}"),
        }
    }
}
