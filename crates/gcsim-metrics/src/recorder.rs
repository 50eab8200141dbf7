//! A `metrics` recorder that keeps everything in memory.
//!
//! Used by the `gcsim` binary to print a JSON summary at the end of a run, and
//! by tests to assert on what the emulator recorded. Each distinct key (name
//! plus label set) gets its own handle; [`InMemoryRecorder::export`] folds
//! them into per-name totals with a one-level breakdown per label key:
//!
//! ```text
//! gcsim.packets.written
//! ├── total: 120
//! └── labels
//!     ├── device:      { av: 72, gse: 48 }
//!     └── packet_kind: { AV_TO_GCS_DATA_1: 24, ... }
//! ```
//!
//! Histograms keep exact count, sum, min and max. Their quantiles come from a
//! sample capped at [`MAX_RETAINED_SAMPLES`] per handle.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics::{
    Counter, CounterFn, Gauge, GaugeFn, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Handles
// ============================================================================

#[derive(Debug, Default)]
struct CounterHandle(AtomicU64);

impl CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn absolute(&self, value: u64) {
        self.0.fetch_max(value, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct GaugeHandle(AtomicU64);

impl GaugeHandle {
    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn update(&self, f: impl Fn(f64) -> f64) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(f(f64::from_bits(bits)).to_bits())
            });
    }
}

impl GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        self.update(|v| v + value);
    }

    fn decrement(&self, value: f64) {
        self.update(|v| v - value);
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Most samples a histogram handle keeps for quantile estimates.
pub const MAX_RETAINED_SAMPLES: usize = 1024;

/// Running aggregates plus a bounded, evenly decimated sample.
///
/// Count, sum, min and max are exact. Every `stride`-th value is retained;
/// when the sample fills up, every other retained value is dropped and the
/// stride doubles, so memory stays bounded however long a run lasts.
#[derive(Debug, Clone)]
struct HistogramState {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    stride: u64,
    samples: Vec<f64>,
}

impl Default for HistogramState {
    fn default() -> Self {
        HistogramState {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            stride: 1,
            samples: Vec::new(),
        }
    }
}

impl HistogramState {
    fn record(&mut self, value: f64) {
        if self.count % self.stride == 0 {
            self.samples.push(value);
            if self.samples.len() >= MAX_RETAINED_SAMPLES {
                let mut index = 0;
                self.samples.retain(|_| {
                    index += 1;
                    index % 2 == 1
                });
                self.stride *= 2;
            }
        }
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

#[derive(Debug, Default)]
struct HistogramHandle(Mutex<HistogramState>);

impl HistogramFn for HistogramHandle {
    fn record(&self, value: f64) {
        self.0.lock().record(value);
    }
}

#[derive(Default)]
struct Registry {
    counters: HashMap<Key, Arc<CounterHandle>>,
    gauges: HashMap<Key, Arc<GaugeHandle>>,
    histograms: HashMap<Key, Arc<HistogramHandle>>,
    described: BTreeMap<String, String>,
}

// ============================================================================
// Recorder
// ============================================================================

/// In-memory [`Recorder`]. Cloning shares the same storage.
#[derive(Clone, Default)]
pub struct InMemoryRecorder {
    registry: Arc<Mutex<Registry>>,
}

impl InMemoryRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metric names that have been described, with their descriptions.
    pub fn described(&self) -> BTreeMap<String, String> {
        self.registry.lock().described.clone()
    }

    /// Aggregates everything recorded so far.
    pub fn export(&self) -> MetricsExport {
        let registry = self.registry.lock();
        let mut metrics = BTreeMap::new();

        let mut counters: BTreeMap<&str, Vec<(&Key, u64)>> = BTreeMap::new();
        for (key, handle) in &registry.counters {
            counters
                .entry(key.name())
                .or_default()
                .push((key, handle.0.load(Ordering::Relaxed)));
        }
        for (name, samples) in counters {
            let value = CounterValue {
                total: samples.iter().map(|(_, v)| v).sum(),
                labels: breakdown(&samples, |vs| vs.iter().sum()),
            };
            metrics.insert(name.to_string(), MetricValue::Counter(value));
        }

        let mut gauges: BTreeMap<&str, Vec<(&Key, f64)>> = BTreeMap::new();
        for (key, handle) in &registry.gauges {
            gauges.entry(key.name()).or_default().push((key, handle.get()));
        }
        for (name, samples) in gauges {
            let value = GaugeValue {
                total: samples.iter().map(|(_, v)| v).sum(),
                labels: breakdown(&samples, |vs| vs.iter().sum()),
            };
            metrics.insert(name.to_string(), MetricValue::Gauge(value));
        }

        let mut histograms: BTreeMap<&str, Vec<(&Key, Vec<HistogramState>)>> = BTreeMap::new();
        for (key, handle) in &registry.histograms {
            histograms
                .entry(key.name())
                .or_default()
                .push((key, vec![handle.0.lock().clone()]));
        }
        for (name, states) in histograms {
            let all: Vec<HistogramState> =
                states.iter().flat_map(|(_, v)| v.iter().cloned()).collect();
            let labels = breakdown(&states, |vs| vs.concat());
            let value = HistogramValue {
                stats: HistogramStats::merge(&all),
                labels: labels
                    .into_iter()
                    .map(|(key, values)| {
                        let stats = values
                            .into_iter()
                            .map(|(value, states)| (value, HistogramStats::merge(&states)))
                            .collect();
                        (key, stats)
                    })
                    .collect(),
            };
            metrics.insert(name.to_string(), MetricValue::Histogram(value));
        }

        MetricsExport { metrics }
    }
}

/// Group samples by each label key and value, combining with `combine`.
fn breakdown<T: Clone>(
    samples: &[(&Key, T)],
    combine: impl Fn(&[T]) -> T,
) -> BTreeMap<String, BTreeMap<String, T>> {
    let mut grouped: BTreeMap<String, BTreeMap<String, Vec<T>>> = BTreeMap::new();
    for (key, value) in samples {
        for label in key.labels() {
            grouped
                .entry(label.key().to_string())
                .or_default()
                .entry(label.value().to_string())
                .or_default()
                .push(value.clone());
        }
    }
    grouped
        .into_iter()
        .map(|(key, by_value)| {
            let combined = by_value
                .into_iter()
                .map(|(value, items)| (value, combine(&items)))
                .collect();
            (key, combined)
        })
        .collect()
}

impl Recorder for InMemoryRecorder {
    fn describe_counter(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_gauge(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn describe_histogram(&self, key: KeyName, _unit: Option<Unit>, description: SharedString) {
        self.describe(key, description);
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let handle = self
            .registry
            .lock()
            .counters
            .entry(key.clone())
            .or_default()
            .clone();
        Counter::from_arc(handle)
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        let handle = self
            .registry
            .lock()
            .gauges
            .entry(key.clone())
            .or_default()
            .clone();
        Gauge::from_arc(handle)
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        let handle = self
            .registry
            .lock()
            .histograms
            .entry(key.clone())
            .or_default()
            .clone();
        Histogram::from_arc(handle)
    }
}

impl InMemoryRecorder {
    fn describe(&self, key: KeyName, description: SharedString) {
        self.registry
            .lock()
            .described
            .insert(key.as_str().to_string(), description.to_string());
    }
}

// ============================================================================
// Export Types
// ============================================================================

/// Aggregated metrics, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    /// One entry per metric name.
    pub metrics: BTreeMap<String, MetricValue>,
}

impl MetricsExport {
    /// Total of a counter, if it was ever incremented.
    pub fn counter_total(&self, name: &str) -> Option<u64> {
        match self.metrics.get(name)? {
            MetricValue::Counter(c) => Some(c.total),
            _ => None,
        }
    }

    /// Counter total restricted to one label value.
    pub fn counter_for(&self, name: &str, label: &str, value: &str) -> Option<u64> {
        match self.metrics.get(name)? {
            MetricValue::Counter(c) => c.labels.get(label)?.get(value).copied(),
            _ => None,
        }
    }

    /// Summary of a histogram.
    pub fn histogram(&self, name: &str) -> Option<&HistogramValue> {
        match self.metrics.get(name)? {
            MetricValue::Histogram(h) => Some(h),
            _ => None,
        }
    }
}

/// A single metric's aggregated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Counter totals.
    Counter(CounterValue),
    /// Histogram summaries.
    Histogram(HistogramValue),
    /// Gauge values.
    Gauge(GaugeValue),
}

/// Counter total with per-label breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterValue {
    pub total: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, BTreeMap<String, u64>>,
}

/// Sum of gauge values with per-label breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeValue {
    pub total: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Histogram summary with per-label breakdowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramValue {
    #[serde(flatten)]
    pub stats: HistogramStats,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, BTreeMap<String, HistogramStats>>,
}

/// Summary statistics over recorded samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

impl HistogramStats {
    /// Summarize `samples`. Empty input gives all zeros.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut state = HistogramState::default();
        for &value in samples {
            state.record(value);
        }
        Self::merge(&[state])
    }

    /// Combine handle states. Quantiles weight each retained sample by its
    /// handle's stride.
    fn merge(states: &[HistogramState]) -> Self {
        let count: u64 = states.iter().map(|s| s.count).sum();
        if count == 0 {
            return Self::default();
        }
        let sum: f64 = states.iter().map(|s| s.sum).sum();
        let min = states.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
        let max = states.iter().map(|s| s.max).fold(f64::NEG_INFINITY, f64::max);

        let mut weighted: Vec<(f64, u64)> = states
            .iter()
            .flat_map(|s| s.samples.iter().map(move |&v| (v, s.stride)))
            .collect();
        weighted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total_weight: u64 = weighted.iter().map(|(_, w)| w).sum();
        let quantile = |q: f64| {
            let rank = (q * (total_weight - 1) as f64).round() as u64;
            let mut seen = 0;
            for &(value, weight) in &weighted {
                seen += weight;
                if seen > rank {
                    return value;
                }
            }
            max
        };

        HistogramStats {
            count,
            sum,
            min,
            max,
            mean: sum / count as f64,
            p50: quantile(0.5),
            p90: quantile(0.9),
            p99: quantile(0.99),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_sample(recorder: &InMemoryRecorder) {
        metrics::with_local_recorder(recorder, || {
            metrics::counter!("gcsim.test.frames", "device" => "av", "packet_kind" => "A").increment(2);
            metrics::counter!("gcsim.test.frames", "device" => "av", "packet_kind" => "B").increment(3);
            metrics::counter!("gcsim.test.frames", "device" => "gse", "packet_kind" => "C").increment(5);
            metrics::gauge!("gcsim.test.wait", "device" => "av").set(1.5);
            metrics::gauge!("gcsim.test.wait", "device" => "av").increment(1.0);
            for size in [10.0, 20.0, 30.0, 40.0] {
                metrics::histogram!("gcsim.test.size", "device" => "gse").record(size);
            }
        });
    }

    #[test]
    fn test_counter_totals_and_breakdown() {
        let recorder = InMemoryRecorder::new();
        record_sample(&recorder);
        let export = recorder.export();

        assert_eq!(export.counter_total("gcsim.test.frames"), Some(10));
        assert_eq!(export.counter_for("gcsim.test.frames", "device", "av"), Some(5));
        assert_eq!(export.counter_for("gcsim.test.frames", "device", "gse"), Some(5));
        assert_eq!(export.counter_for("gcsim.test.frames", "packet_kind", "B"), Some(3));
        assert_eq!(export.counter_total("gcsim.test.missing"), None);
    }

    #[test]
    fn test_gauge_and_histogram() {
        let recorder = InMemoryRecorder::new();
        record_sample(&recorder);
        let export = recorder.export();

        match &export.metrics["gcsim.test.wait"] {
            MetricValue::Gauge(g) => assert_eq!(g.total, 2.5),
            other => panic!("expected gauge, got {:?}", other),
        }

        let h = export.histogram("gcsim.test.size").unwrap();
        assert_eq!(h.stats.count, 4);
        assert_eq!(h.stats.sum, 100.0);
        assert_eq!(h.stats.min, 10.0);
        assert_eq!(h.stats.max, 40.0);
        assert_eq!(h.stats.mean, 25.0);
        assert_eq!(h.labels["device"]["gse"].count, 4);
    }

    #[test]
    fn test_export_json_shape() {
        let recorder = InMemoryRecorder::new();
        record_sample(&recorder);
        let json = serde_json::to_value(recorder.export()).unwrap();

        assert_eq!(json["metrics"]["gcsim.test.frames"]["total"], 10);
        assert_eq!(json["metrics"]["gcsim.test.frames"]["labels"]["device"]["gse"], 5);
        assert_eq!(json["metrics"]["gcsim.test.size"]["count"], 4);
        assert_eq!(json["metrics"]["gcsim.test.size"]["p50"], 30.0);
    }

    #[test]
    fn test_histogram_stats_empty() {
        assert_eq!(HistogramStats::from_samples(&[]), HistogramStats::default());
    }

    #[test]
    fn test_histogram_memory_is_bounded() {
        let handle = HistogramHandle::default();
        for i in 0..200_000 {
            handle.record(i as f64);
        }
        let state = handle.0.lock().clone();
        assert!(state.samples.len() < MAX_RETAINED_SAMPLES);
        assert!(state.stride > 1);

        let stats = HistogramStats::merge(&[state]);
        assert_eq!(stats.count, 200_000);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 199_999.0);
        assert_eq!(stats.sum, (0..200_000u64).sum::<u64>() as f64);
        assert!((stats.p50 - 100_000.0).abs() < 2_000.0, "p50 {}", stats.p50);
        assert!((stats.p90 - 180_000.0).abs() < 2_000.0, "p90 {}", stats.p90);
    }

    #[test]
    fn test_histogram_merge_weights_by_stride() {
        // a long-running handle of small values and a short one of large values
        let mut busy = HistogramState::default();
        for _ in 0..10_000 {
            busy.record(1.0);
        }
        let mut quiet = HistogramState::default();
        for _ in 0..100 {
            quiet.record(1000.0);
        }

        let stats = HistogramStats::merge(&[busy, quiet]);
        assert_eq!(stats.count, 10_100);
        assert_eq!(stats.p50, 1.0);
        assert_eq!(stats.p90, 1.0);
        assert_eq!(stats.max, 1000.0);
    }
}
