//! Error types for the refcache library.
//!
//! Cache operations themselves are infallible by design: misses are
//! `Option`, absent keys erase to a no-op, and allocation failure aborts.
//! The two error types here cover the edges around the cache proper:
//!
//! - [`ConfigError`]: construction parameters rejected by
//!   [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build).
//! - [`InvariantError`]: shard-state invariant violations, reported by the
//!   debug/test-only `check_invariants` methods.

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Report of a violated shard-state invariant.
///
/// Produced by the debug-only `check_invariants` methods on
/// [`LruShard`](crate::policy::lru::LruShard) and
/// [`ShardedLruCache`](crate::policy::sharded::ShardedLruCache). Carries
/// the condition that failed and, when the check ran through the sharded
/// cache, the index of the offending shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError {
    detail: &'static str,
    shard: Option<usize>,
}

impl InvariantError {
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn new(detail: &'static str) -> Self {
        Self {
            detail,
            shard: None,
        }
    }

    /// Attributes this violation to a shard by index.
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn in_shard(mut self, shard: usize) -> Self {
        self.shard = Some(shard);
        self
    }

    /// Returns the condition that failed.
    pub fn detail(&self) -> &'static str {
        self.detail
    }

    /// Returns the index of the offending shard, when known.
    pub fn shard(&self) -> Option<usize> {
        self.shard
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shard {
            Some(shard) => write!(f, "cache invariant violated in shard {shard}: {}", self.detail),
            None => write!(f, "cache invariant violated: {}", self.detail),
        }
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Construction parameter rejected during cache configuration.
///
/// Produced by [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build);
/// the panicking constructors assert the same bounds.
///
/// # Example
///
/// ```
/// use refcache::builder::CacheBuilder;
/// use refcache::error::ConfigError;
///
/// let err = CacheBuilder::new(1000)
///     .shard_bits(32)
///     .try_build::<Vec<u8>>()
///     .unwrap_err();
/// assert!(matches!(
///     err,
///     ConfigError::ShardBitsOutOfRange { requested: 32, .. }
/// ));
/// assert!(err.to_string().contains("shard_bits"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The requested shard-selector bit count exceeds what the 32-bit key
    /// hash can reasonably feed.
    ShardBitsOutOfRange {
        /// The rejected bit count.
        requested: u32,
        /// The largest supported bit count.
        max: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ShardBitsOutOfRange { requested, max } => write!(
                f,
                "shard_bits {requested} is out of range: at most {max} ({} shards) supported",
                1u32 << max
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_error_carries_shard_attribution() {
        let err = InvariantError::new("usage disagrees with listed charges");
        assert_eq!(err.detail(), "usage disagrees with listed charges");
        assert_eq!(err.shard(), None);
        assert_eq!(
            err.to_string(),
            "cache invariant violated: usage disagrees with listed charges"
        );

        let err = err.in_shard(3);
        assert_eq!(err.shard(), Some(3));
        assert!(err.to_string().contains("in shard 3"));
    }

    #[test]
    fn config_error_names_parameter_and_bounds() {
        let err = ConfigError::ShardBitsOutOfRange {
            requested: 32,
            max: 8,
        };
        let text = err.to_string();
        assert!(text.contains("shard_bits"));
        assert!(text.contains("32"));
        assert!(text.contains("256 shards"));
    }
}
