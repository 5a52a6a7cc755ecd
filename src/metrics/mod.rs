//! Feature-gated cache observability.
//!
//! Mirrors the cache surface with small, composable pieces: recording
//! (counters bumped inside the shard lock), snapshotting (point-in-time
//! aggregate views for tests and monitoring), and export (publishing a
//! snapshot to an external system). Policy code records; consumers only
//! ever see snapshots.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::ShardMetrics;
pub use snapshot::CacheMetricsSnapshot;
pub use traits::{CacheMetricsRecorder, MetricsExporter, MetricsSnapshotProvider};
