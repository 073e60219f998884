//! # neu-metrics
//!
//! Metrics for the NeuChain execution engine.
//!
//! Features:
//! - Latency histograms (phase durations in microseconds)
//! - Counters for transaction verdicts and batches
//! - Gauges for pool sizes
//! - JSON snapshot export

#![warn(missing_docs)]
#![warn(clippy::all)]

mod histogram;
mod registry;
mod snapshot;

pub use histogram::Histogram;
pub use registry::Metrics;
pub use snapshot::{HistogramSummary, MetricsSnapshot};

/// Time an expression and record its duration in microseconds
///
/// ```
/// use neu_metrics::{timed, Metrics};
///
/// let metrics = Metrics::new();
/// let sum = timed!(metrics, "sum_us", { (0..10u32).sum::<u32>() });
/// assert_eq!(sum, 45);
/// assert_eq!(metrics.histogram_count("sum_us"), Some(1));
/// ```
#[macro_export]
macro_rules! timed {
    ($metrics:expr, $name:expr, $body:expr) => {{
        let start = std::time::Instant::now();
        let result = $body;
        $metrics.observe($name, start.elapsed().as_micros() as u64);
        result
    }};
}
