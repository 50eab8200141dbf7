//! Metrics infrastructure for the ground-control link emulator.
//!
//! Declares every metric the emulator records as a structured [`Metric`]
//! constant, provides label helpers keyed by device and packet kind, and ships
//! an [`InMemoryRecorder`] that aggregates everything for an end-of-run export.
//!
//! # Example
//!
//! ```rust
//! use gcsim_metrics::{metric_defs, InMemoryRecorder, MetricLabels};
//!
//! let recorder = InMemoryRecorder::new();
//! metrics::with_local_recorder(&recorder, || {
//!     let labels = MetricLabels::new("av").with_packet_kind("AV_TO_GCS_DATA_1");
//!     metrics::counter!(metric_defs::PACKETS_WRITTEN.name, &labels.to_labels()).increment(1);
//! });
//!
//! let export = recorder.export();
//! assert_eq!(export.counter_total(metric_defs::PACKETS_WRITTEN.name), Some(1));
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

mod recorder;

pub use recorder::*;

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use gcsim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("gcsim.test.frames")
///     .with_description("Frames seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["device"]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "gcsim.packets.written").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn of_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a counter metric.
    pub const fn counter(name: &'static str) -> Self {
        Self::of_kind(name, MetricKind::Counter)
    }

    /// Creates a gauge metric.
    pub const fn gauge(name: &'static str) -> Self {
        Self::of_kind(name, MetricKind::Gauge)
    }

    /// Creates a histogram metric.
    pub const fn histogram(name: &'static str) -> Self {
        Self::of_kind(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// Returns the unit as a human-readable string.
    pub fn unit_str(&self) -> &'static str {
        self.unit.map(|u| u.as_str()).unwrap_or("")
    }
}

/// All metric definitions for the emulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Standard Label Keys
    // ========================================================================

    /// Labels present on every per-packet metric.
    pub const PACKET_LABELS: &[&str] = &["device", "packet_kind"];

    /// Labels on device-scoped metrics.
    pub const DEVICE_LABELS: &[&str] = &["device"];

    // ========================================================================
    // Packet Pipeline
    // ========================================================================

    /// Value sets produced by the synthesizer.
    pub const PACKETS_GENERATED: Metric = Metric::counter("gcsim.packets.generated")
        .with_description("Telemetry value sets synthesized")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Frames handed to the transport successfully.
    pub const PACKETS_WRITTEN: Metric = Metric::counter("gcsim.packets.written")
        .with_description("Frames written to the device")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Packets discarded by simulated packet loss.
    pub const PACKETS_DROPPED: Metric = Metric::counter("gcsim.packets.dropped")
        .with_description("Packets discarded by simulated packet loss")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Packets held back because the device's sequence lock was absent.
    pub const PACKETS_GATED: Metric = Metric::counter("gcsim.packets.gated")
        .with_description("Packets suppressed while awaiting the sequence lock")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Packets with at least one corrupted value.
    pub const PACKETS_CORRUPTED: Metric = Metric::counter("gcsim.packets.corrupted")
        .with_description("Packets with at least one bit-flipped value")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Individual values altered by corruption.
    pub const FIELDS_CORRUPTED: Metric = Metric::counter("gcsim.corruption.fields")
        .with_description("Values altered by corruption")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Rendered frame size.
    pub const FRAME_SIZE: Metric = Metric::histogram("gcsim.frame.size_bytes")
        .with_description("Rendered frame size in bytes")
        .with_unit(Unit::Bytes)
        .with_labels(PACKET_LABELS);

    // ========================================================================
    // Errors
    // ========================================================================

    /// Packets that failed to encode.
    pub const ENCODE_ERRORS: Metric = Metric::counter("gcsim.errors.encode")
        .with_description("Packets that failed validation or encoding")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    /// Failed transport writes.
    pub const TRANSPORT_ERRORS: Metric = Metric::counter("gcsim.errors.transport")
        .with_description("Failed writes to the device")
        .with_unit(Unit::Count)
        .with_labels(PACKET_LABELS);

    // ========================================================================
    // Timing
    // ========================================================================

    /// Time spent inside a single transport write, lock held.
    pub const WRITE_TIME: Metric = Metric::histogram("gcsim.transport.write_time_us")
        .with_description("Time holding the transport lock per write")
        .with_unit(Unit::Microseconds)
        .with_labels(&["device", "mode"]);

    /// Seconds a device has been waiting for its sequence lock.
    pub const LOCK_WAIT: Metric = Metric::gauge("gcsim.sequence.lock_wait_s")
        .with_description("Seconds since the device last wrote while gated")
        .with_unit(Unit::Seconds)
        .with_labels(DEVICE_LABELS);

    /// How far a producer loop is behind its schedule.
    pub const PACING_LAG: Metric = Metric::gauge("gcsim.pacing.lag_ms")
        .with_description("Producer loop lag behind schedule")
        .with_unit(Unit::Milliseconds)
        .with_labels(DEVICE_LABELS);

    /// Every metric defined above.
    pub const ALL: &[&Metric] = &[
        &PACKETS_GENERATED,
        &PACKETS_WRITTEN,
        &PACKETS_DROPPED,
        &PACKETS_GATED,
        &PACKETS_CORRUPTED,
        &FIELDS_CORRUPTED,
        &FRAME_SIZE,
        &ENCODE_ERRORS,
        &TRANSPORT_ERRORS,
        &WRITE_TIME,
        &LOCK_WAIT,
        &PACING_LAG,
    ];
}

/// Labels identifying which device and packet kind a sample belongs to.
///
/// ```rust
/// use gcsim_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("gse").with_packet_kind("GSE_TO_GCS_DATA_2");
/// assert_eq!(labels.to_labels().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricLabels {
    /// Origin device (av, gse, gcs).
    pub device: String,
    /// Packet kind name, absent for device-scoped metrics.
    pub packet_kind: Option<String>,
}

impl MetricLabels {
    /// Labels for a device.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            packet_kind: None,
        }
    }

    /// Adds the packet kind.
    pub fn with_packet_kind(mut self, packet_kind: impl Into<String>) -> Self {
        self.packet_kind = Some(packet_kind.into());
        self
    }

    /// Converts to the `metrics` crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("device", self.device.clone())];
        if let Some(kind) = &self.packet_kind {
            labels.push(("packet_kind", kind.clone()));
        }
        labels
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Registers descriptions for every metric. Call once after installing a
/// recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
