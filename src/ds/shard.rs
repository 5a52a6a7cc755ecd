//! Key hashing and shard routing.
//!
//! Every cache operation starts by hashing the key once; the resulting
//! 32-bit hash does triple duty:
//!
//! ```text
//!   hash = bytes_hash(key)            (FxHasher, folded 64 -> 32)
//!
//!   ┌──────── high bits ────────┬──────── low bits ────────┐
//!   │ shard_index(hash, bits)   │ bucket = hash & (len-1)  │
//!   └───────────────────────────┴──────────────────────────┘
//!                                 plus cheap equality tiebreak
//!                                 before comparing key bytes
//! ```
//!
//! The high bits select the shard so the hash-table bucket selection (which
//! consumes the low bits) stays independent of the shard split. The hash is
//! stable within a process run, well distributed, and deterministic for a
//! given key; it is not cryptographic and is never persisted.

use std::hash::Hasher;

use rustc_hash::FxHasher;

/// Hashes a byte-string key to the 32-bit value used for shard routing,
/// bucket selection, and comparison tiebreaks.
pub fn bytes_hash(key: &[u8]) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write(key);
    let h = hasher.finish();
    // Fold the full 64-bit state so both halves contribute to the 32 bits
    // the cache routes on.
    ((h >> 32) ^ h) as u32
}

/// Maps a key hash to a shard index using its `shard_bits` high bits.
///
/// `shard_bits == 0` means a single shard; every hash maps to index 0.
pub fn shard_index(hash: u32, shard_bits: u32) -> usize {
    debug_assert!(shard_bits <= 16);
    if shard_bits == 0 {
        0
    } else {
        (hash >> (32 - shard_bits)) as usize
    }
}
