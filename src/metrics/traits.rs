//! Metrics trait hierarchy.
//!
//! Separates *recording*, *snapshotting*, and *export* responsibilities so
//! monitoring concerns never couple to cache policy logic:
//!
//! ```text
//!   ┌────────────────────────────┐
//!   │   CacheMetricsRecorder     │  bumped by the shard, under its lock
//!   └─────────────┬──────────────┘
//!                 │ counters copied out on demand
//!                 ▼
//!   ┌────────────────────────────┐     ┌────────────────────────────┐
//!   │ MetricsSnapshotProvider<S> │ ──► │ MetricsExporter<S>         │
//!   │ (bench/test reads)         │     │ (production monitoring)    │
//!   └────────────────────────────┘     └────────────────────────────┘
//! ```
//!
//! Recorders take `&mut self`: every recording site in this crate sits
//! behind a shard mutex, so no interior mutability is needed.

/// Counters recorded by a cache shard.
pub trait CacheMetricsRecorder {
    fn record_lookup_hit(&mut self);
    fn record_lookup_miss(&mut self);
    fn record_insert_call(&mut self);
    fn record_insert_displacement(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_erase_call(&mut self);
    fn record_erase_found(&mut self);
    fn record_prune_call(&mut self);
    fn record_pruned_entry(&mut self);
    fn record_deleter_run(&mut self);
}

/// Produces a point-in-time metrics snapshot of type `S`.
pub trait MetricsSnapshotProvider<S> {
    fn metrics_snapshot(&self) -> S;
}

/// Publishes a metrics snapshot to an external consumer.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
