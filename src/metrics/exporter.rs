use std::io::Write;
use std::sync::Mutex;

use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// Writes in the Prometheus text exposition format so it can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
            .into_inner()
            .expect("metrics exporter writer poisoned")
    }

    fn write_counter(&self, name: &str, value: u64) {
        let mut writer = self
            .writer
            .lock()
            .expect("metrics exporter writer poisoned");
        let _ = writeln!(writer, "# TYPE {} counter", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        let mut writer = self
            .writer
            .lock()
            .expect("metrics exporter writer poisoned");
        let _ = writeln!(writer, "# TYPE {} gauge", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<CacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheMetricsSnapshot) {
        self.write_counter(&self.metric_name("lookup_calls_total"), snapshot.lookup_calls);
        self.write_counter(&self.metric_name("lookup_hits_total"), snapshot.lookup_hits);
        self.write_counter(
            &self.metric_name("lookup_misses_total"),
            snapshot.lookup_misses,
        );
        self.write_counter(&self.metric_name("insert_calls_total"), snapshot.insert_calls);
        self.write_counter(
            &self.metric_name("insert_displacements_total"),
            snapshot.insert_displacements,
        );
        self.write_counter(
            &self.metric_name("evicted_entries_total"),
            snapshot.evicted_entries,
        );
        self.write_counter(&self.metric_name("erase_calls_total"), snapshot.erase_calls);
        self.write_counter(&self.metric_name("erase_found_total"), snapshot.erase_found);
        self.write_counter(&self.metric_name("prune_calls_total"), snapshot.prune_calls);
        self.write_counter(
            &self.metric_name("pruned_entries_total"),
            snapshot.pruned_entries,
        );
        self.write_counter(&self.metric_name("deleter_runs_total"), snapshot.deleter_runs);

        self.write_gauge(&self.metric_name("usage"), snapshot.usage as u64);
        self.write_gauge(&self.metric_name("capacity"), snapshot.capacity as u64);
        self.write_gauge(&self.metric_name("entries"), snapshot.entries as u64);
        self.write_gauge(
            &self.metric_name("pinned_entries"),
            snapshot.pinned_entries as u64,
        );
        self.write_gauge(
            &self.metric_name("evictable_entries"),
            snapshot.evictable_entries as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_writes_prometheus_text() {
        let snapshot = CacheMetricsSnapshot {
            lookup_calls: 10,
            lookup_hits: 7,
            lookup_misses: 3,
            usage: 128,
            capacity: 1024,
            ..Default::default()
        };

        let exporter = PrometheusTextExporter::new("refcache", Vec::new());
        exporter.export(&snapshot);
        let output = String::from_utf8(exporter.into_writer()).unwrap();

        assert!(output.contains("# TYPE refcache_lookup_hits_total counter"));
        assert!(output.contains("refcache_lookup_hits_total 7"));
        assert!(output.contains("# TYPE refcache_usage gauge"));
        assert!(output.contains("refcache_usage 128"));
        assert!(output.contains("refcache_capacity 1024"));
    }

    #[test]
    fn exporter_without_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&CacheMetricsSnapshot::default());
        let output = String::from_utf8(exporter.into_writer()).unwrap();
        assert!(output.contains("\nlookup_calls_total 0"));
    }
}
