pub mod lru;
pub mod sharded;

pub use lru::{CacheHandle, LruShard};
pub use sharded::{new_lru_cache, ShardedLruCache, DEFAULT_SHARD_BITS, MAX_SHARD_BITS};
