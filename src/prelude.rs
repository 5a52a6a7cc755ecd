pub use crate::builder::CacheBuilder;
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::lru::{CacheHandle, LruShard};
pub use crate::policy::sharded::{new_lru_cache, ShardedLruCache};
pub use crate::singleton::{bytewise_comparator, Comparator, NoDestructor};
pub use crate::traits::{Cache, DeleterFn};

#[cfg(feature = "metrics")]
pub use crate::metrics::{CacheMetricsSnapshot, MetricsExporter, MetricsSnapshotProvider};
