//! # Public cache interface
//!
//! [`Cache`] is the one abstraction point clients see: a mapping from
//! byte-string keys to shared values, with caller-supplied per-entry costs
//! and per-entry deleters, safe for concurrent use from any number of
//! threads. The built-in implementation is the sharded LRU cache
//! ([`ShardedLruCache`](crate::policy::sharded::ShardedLruCache)); anything
//! satisfying this contract is admissible.
//!
//! ## Ownership protocol
//!
//! | Op        | Transfers                                              |
//! |-----------|--------------------------------------------------------|
//! | `insert`  | key bytes copied in; one reference out (the handle)    |
//! | `lookup`  | one reference out per hit                              |
//! | `release` | consumes the handle, returning its reference           |
//! | value     | borrow via [`CacheHandle::value`]; no lock taken       |
//!
//! Each handle is an owned reference count on its entry. Dropping a handle
//! is equivalent to releasing it, so `release` exists for callers that want
//! the hand-back to be explicit. The entry's deleter runs exactly once,
//! when the last reference (cache's or a client's) drops.
//!
//! Misses are `None`, absent keys erase to a no-op, and allocation failure
//! aborts; no operation returns an error.

use std::sync::Arc;

use crate::policy::lru::CacheHandle;

/// Per-entry destruction callback: receives the entry's key bytes and its
/// value when the entry's reference count reaches zero. Runs exactly once,
/// while the owning shard's mutex is held, so it must not call back into
/// the cache.
pub type DeleterFn<V> = Box<dyn FnOnce(&[u8], Arc<V>) + Send>;

/// A concurrent mapping from byte-string keys to opaque values with
/// caller-supplied costs, bounded by a total cost capacity.
///
/// Entries referenced by outstanding handles are pinned: they are never
/// evicted, and remain readable through their handles even after eviction,
/// erasure, or replacement by a duplicate-key insert.
pub trait Cache<V>: Send + Sync {
    /// Inserts `key -> value`, charging `charge` against the capacity, and
    /// returns a handle to the new entry. A resident entry with the same
    /// key is displaced. The handle is valid even when the capacity is 0
    /// (caching disabled); the entry simply is not retained.
    fn insert(&self, key: &[u8], value: V, charge: usize, deleter: DeleterFn<V>) -> CacheHandle<V>;

    /// Returns a handle to the entry for `key`, or `None` on a miss. A hit
    /// pins the entry and refreshes its recency.
    fn lookup(&self, key: &[u8]) -> Option<CacheHandle<V>>;

    /// Releases a handle previously returned by `insert` or `lookup`.
    /// Equivalent to dropping it.
    fn release(&self, handle: CacheHandle<V>);

    /// Removes the entry for `key`, if resident. Outstanding handles keep
    /// the underlying entry alive; a missing key is a no-op.
    fn erase(&self, key: &[u8]);

    /// Returns a new unique numeric id. Clients sharing one cache may use
    /// ids to partition the key space.
    fn new_id(&self) -> u64;

    /// Evicts every entry not currently pinned by a handle.
    fn prune(&self);

    /// Returns the summed charge of all resident entries. Shards are
    /// sampled under their own locks, so the total is not an atomic
    /// cross-shard snapshot.
    fn total_charge(&self) -> usize;
}
