//! refcache: concurrent, sharded, reference-counted LRU object cache with
//! pinning semantics.
//!
//! The in-memory lookup tier of a storage engine: clients associate opaque
//! values with byte-string keys, charge each entry a caller-supplied cost,
//! and the cache enforces a total cost ceiling by evicting the
//! least-recently-used *unpinned* entries. Entries held through a
//! [`CacheHandle`](policy::lru::CacheHandle) stay valid even after eviction
//! or replacement; a per-entry deleter runs exactly once when the last
//! reference drops.
//!
//! See `DESIGN.md` for internal architecture and invariants.
//!
//! ```
//! use refcache::policy::sharded::new_lru_cache;
//! use refcache::traits::Cache;
//!
//! let cache = new_lru_cache::<Vec<u8>>(1 << 20);
//!
//! let block = cache.insert(b"table/7/block/3", vec![0u8; 4096], 4096, Box::new(|_, _| {}));
//! assert_eq!(block.value().len(), 4096);
//! drop(block); // unpin; the entry stays cached
//!
//! assert!(cache.lookup(b"table/7/block/3").is_some());
//! ```

pub mod ds;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod builder;
pub mod error;
pub mod prelude;
pub mod singleton;
pub mod traits;
