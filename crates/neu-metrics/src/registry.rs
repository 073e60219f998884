//! Named metric registry

use crate::histogram::Histogram;
use crate::snapshot::{HistogramSummary, MetricsSnapshot};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe store of counters, gauges and histograms
///
/// Metrics are created on first use. Lookups of existing metrics only take
/// the read lock.
#[derive(Default)]
pub struct Metrics {
    counters: RwLock<BTreeMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<BTreeMap<String, Arc<AtomicI64>>>,
    histograms: RwLock<BTreeMap<String, Arc<Histogram>>>,
}

fn get_or_create<T, F>(map: &RwLock<BTreeMap<String, Arc<T>>>, name: &str, init: F) -> Arc<T>
where
    F: FnOnce() -> T,
{
    if let Some(existing) = map.read().get(name) {
        return Arc::clone(existing);
    }
    let mut map = map.write();
    Arc::clone(map.entry(name.to_string()).or_insert_with(|| Arc::new(init())))
}

impl Metrics {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to a counter
    pub fn incr(&self, name: &str, delta: u64) {
        get_or_create(&self.counters, name, || AtomicU64::new(0)).fetch_add(delta, Ordering::Relaxed);
    }

    /// Set a gauge
    pub fn set_gauge(&self, name: &str, value: i64) {
        get_or_create(&self.gauges, name, || AtomicI64::new(0)).store(value, Ordering::Relaxed);
    }

    /// Record a histogram observation
    pub fn observe(&self, name: &str, value: u64) {
        get_or_create(&self.histograms, name, Histogram::new).observe(value);
    }

    /// Counter value
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Gauge value
    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.read().get(name).map(|g| g.load(Ordering::Relaxed))
    }

    /// Number of observations of a histogram
    pub fn histogram_count(&self, name: &str) -> Option<u64> {
        self.histograms.read().get(name).map(|h| h.count())
    }

    /// Shared handle to a histogram
    pub fn histogram(&self, name: &str) -> Option<Arc<Histogram>> {
        self.histograms.read().get(name).cloned()
    }

    /// Point-in-time copy of every metric
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        let gauges = self
            .gauges
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        let histograms = self
            .histograms
            .read()
            .iter()
            .map(|(k, h)| (k.clone(), HistogramSummary::from_histogram(h)))
            .collect();
        MetricsSnapshot {
            counters,
            gauges,
            histograms,
        }
    }
}
