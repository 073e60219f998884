//! Fixed-bucket histogram

use std::sync::atomic::{AtomicU64, Ordering};

/// Default bucket upper bounds in microseconds
pub const DEFAULT_BUCKETS_US: [u64; 10] = [10, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 50_000];

/// Lock-free histogram over integer observations
///
/// Each bucket counts values `<= bound`; values above the last bound go to
/// a separate overflow bucket.
pub struct Histogram {
    bounds: Vec<u64>,
    // one extra slot for overflow
    buckets: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Histogram with [`DEFAULT_BUCKETS_US`]
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_BUCKETS_US.to_vec())
    }

    /// Histogram with custom bucket bounds; bounds are sorted and deduplicated
    pub fn with_bounds(mut bounds: Vec<u64>) -> Self {
        bounds.sort_unstable();
        bounds.dedup();
        let buckets = (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            buckets,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }

    /// Record one observation
    pub fn observe(&self, value: u64) {
        let idx = self.bounds.partition_point(|bound| *bound < value);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.min.fetch_min(value, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);
    }

    /// Number of observations
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of all observations
    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    /// Mean, `0.0` when empty
    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum() as f64 / count as f64
    }

    /// Smallest observation
    pub fn min(&self) -> Option<u64> {
        (self.count() > 0).then(|| self.min.load(Ordering::Relaxed))
    }

    /// Largest observation
    pub fn max(&self) -> Option<u64> {
        (self.count() > 0).then(|| self.max.load(Ordering::Relaxed))
    }

    /// Upper bound of the bucket holding the `q` quantile (`0.0..=1.0`)
    ///
    /// Observations in the overflow bucket report the maximum seen.
    pub fn quantile(&self, q: f64) -> Option<u64> {
        let count = self.count();
        if count == 0 {
            return None;
        }
        let rank = ((q.clamp(0.0, 1.0) * count as f64).ceil() as u64).max(1);
        let mut seen = 0;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            seen += bucket.load(Ordering::Relaxed);
            if seen >= rank {
                return Some(self.bounds.get(idx).copied().unwrap_or_else(|| self.max.load(Ordering::Relaxed)));
            }
        }
        self.max()
    }

    /// `(bound, count)` per bucket; the overflow bucket has bound `None`
    pub fn buckets(&self) -> Vec<(Option<u64>, u64)> {
        self.buckets
            .iter()
            .enumerate()
            .map(|(idx, bucket)| (self.bounds.get(idx).copied(), bucket.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
