//! Compression metrics and the sink they are reported to

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Size figures for a single compress or decompress call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionMetrics {
    /// Input size in character units
    pub original_size: usize,
    /// Output size in character units
    pub compressed_size: usize,
    /// `original_size / compressed_size`, 1.0 when nothing was compressed
    pub compression_ratio: f64,
    pub was_compressed: bool,
    pub timestamp: DateTime<Utc>,
}

impl CompressionMetrics {
    /// Metrics for a payload that passed through untouched
    pub fn uncompressed(size: usize) -> Self {
        Self {
            original_size: size,
            compressed_size: size,
            compression_ratio: 1.0,
            was_compressed: false,
            timestamp: Utc::now(),
        }
    }

    /// Metrics for a payload that was transformed
    pub fn compressed(original_size: usize, compressed_size: usize) -> Self {
        let compression_ratio = if compressed_size == 0 {
            1.0
        } else {
            original_size as f64 / compressed_size as f64
        };
        Self {
            original_size,
            compressed_size,
            compression_ratio,
            was_compressed: true,
            timestamp: Utc::now(),
        }
    }

    /// Character units saved; negative when the output grew
    pub fn savings(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }

    /// Savings as a percentage of the original size
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.savings() as f64 / self.original_size as f64 * 100.0
        }
    }

    /// The payload handed to a [`MetricsSink`]
    pub fn to_event(&self) -> CompressionEvent {
        CompressionEvent {
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            compression_ratio: self.compression_ratio,
            was_compressed: self.was_compressed,
            savings_bytes: self.savings(),
            savings_percent: self.savings_percent(),
        }
    }
}

/// What the external metrics sink receives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionEvent {
    pub original_size: usize,
    pub compressed_size: usize,
    pub compression_ratio: f64,
    pub was_compressed: bool,
    pub savings_bytes: i64,
    pub savings_percent: f64,
}

/// Fire-and-forget receiver of compression metrics.
///
/// The codec never inspects what a sink does with an event.
pub trait MetricsSink: Send + Sync {
    fn record(&self, operation: &str, event: &CompressionEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _operation: &str, _event: &CompressionEvent) {}
}

/// Emits each event as a structured `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record(&self, operation: &str, event: &CompressionEvent) {
        tracing::info!(
            target: "hyvve::metrics",
            operation,
            original_size = event.original_size,
            compressed_size = event.compressed_size,
            compression_ratio = event.compression_ratio,
            was_compressed = event.was_compressed,
            savings_bytes = event.savings_bytes,
            savings_percent = event.savings_percent,
            "compression metrics"
        );
    }
}

/// Keeps every event in memory, oldest first
#[derive(Debug, Default)]
pub struct RecordingMetricsSink {
    events: Mutex<Vec<(String, CompressionEvent)>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded `(operation, event)` pairs
    pub fn events(&self) -> Vec<(String, CompressionEvent)> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn record(&self, operation: &str, event: &CompressionEvent) {
        self.events.lock().push((operation.to_string(), event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncompressed_metrics() {
        let metrics = CompressionMetrics::uncompressed(42);
        assert_eq!(metrics.compression_ratio, 1.0);
        assert!(!metrics.was_compressed);
        assert_eq!(metrics.savings(), 0);
        assert_eq!(metrics.savings_percent(), 0.0);
    }

    #[test]
    fn test_compressed_metrics() {
        let metrics = CompressionMetrics::compressed(1000, 250);
        assert_eq!(metrics.compression_ratio, 4.0);
        let event = metrics.to_event();
        assert_eq!(event.savings_bytes, 750);
        assert_eq!(event.savings_percent, 75.0);
        assert!(event.was_compressed);
    }

    #[test]
    fn test_empty_input_has_no_savings() {
        let metrics = CompressionMetrics::compressed(0, 0);
        assert_eq!(metrics.compression_ratio, 1.0);
        assert_eq!(metrics.savings_percent(), 0.0);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingMetricsSink::new();
        assert!(sink.is_empty());

        sink.record("compress", &CompressionMetrics::uncompressed(3).to_event());
        sink.record("compress", &CompressionMetrics::compressed(10, 5).to_event());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "compress");
        assert!(!events[0].1.was_compressed);
        assert!(events[1].1.was_compressed);

        sink.clear();
        assert_eq!(sink.len(), 0);
    }
}
