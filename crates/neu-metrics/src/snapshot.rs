//! Serializable metrics snapshot

use crate::histogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All metrics at a point in time, keyed by name in sorted order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Counter values
    pub counters: BTreeMap<String, u64>,
    /// Gauge values
    pub gauges: BTreeMap<String, i64>,
    /// Histogram summaries
    pub histograms: BTreeMap<String, HistogramSummary>,
}

/// Summary of a histogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Observation count
    pub count: u64,
    /// Mean
    pub mean: f64,
    /// Smallest observation
    pub min: Option<u64>,
    /// Largest observation
    pub max: Option<u64>,
    /// Bucket bound of the median
    pub p50: Option<u64>,
    /// Bucket bound of the 99th percentile
    pub p99: Option<u64>,
}

impl HistogramSummary {
    /// Summarize a histogram
    pub fn from_histogram(h: &Histogram) -> Self {
        Self {
            count: h.count(),
            mean: h.mean(),
            min: h.min(),
            max: h.max(),
            p50: h.quantile(0.5),
            p99: h.quantile(0.99),
        }
    }
}

impl MetricsSnapshot {
    /// Pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Single-line JSON
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
