//! Threshold-gated compression of serialized documents
//!
//! Text at or below the threshold is stored as is. Larger text is gzipped and
//! base64-encoded so it can still live in a string-valued host store.
//!
//! The two directions handle failure differently on purpose:
//! - compression fails *open*: the original text is returned uncompressed,
//!   so a write never fails just because compression did;
//! - decompression fails *closed*: a [`CompressionError`] carrying the raw
//!   payload is returned, because handing corrupted text to the JSON parser
//!   would hide the real failure.
//!
//! Keep this asymmetry when changing either path.

mod metrics;
mod transform;

pub use metrics::{
    CompressionEvent, CompressionMetrics, MetricsSink, NoopMetricsSink, RecordingMetricsSink,
    TracingMetricsSink,
};
pub use transform::TransformError;

use crate::config::PersistenceConfig;
use hyvve_core::constants::COMPRESS_OPERATION;
use hyvve_core::{char_units, CompressionError};
use std::sync::Arc;

/// Result of [`CompressionCodec::compress_if_needed`]
#[derive(Debug, Clone)]
pub struct CompressionOutput {
    /// Text to store
    pub data: String,
    /// Whether `data` must be decompressed on read
    pub compressed: bool,
    pub metrics: CompressionMetrics,
}

/// Conditionally compresses text and reports every call to a metrics sink
#[derive(Clone)]
pub struct CompressionCodec {
    threshold: usize,
    dev_logging: bool,
    sink: Arc<dyn MetricsSink>,
}

impl CompressionCodec {
    pub fn new(threshold: usize, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            threshold,
            dev_logging: false,
            sink,
        }
    }

    pub fn from_config(config: &PersistenceConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            threshold: config.compression_threshold,
            dev_logging: config.dev_logging,
            sink,
        }
    }

    #[must_use]
    pub fn with_dev_logging(mut self, enabled: bool) -> Self {
        self.dev_logging = enabled;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Compress `text` when it is longer than the threshold.
    ///
    /// Never fails: on a transform error the original text comes back with
    /// `compressed == false`.
    pub fn compress_if_needed(&self, text: &str) -> CompressionOutput {
        let original_size = char_units(text);

        if original_size <= self.threshold {
            let metrics = CompressionMetrics::uncompressed(original_size);
            return self.finish(text.to_string(), false, metrics);
        }

        match transform::compress(text) {
            Ok(data) => {
                let metrics = CompressionMetrics::compressed(original_size, char_units(&data));
                if self.dev_logging {
                    tracing::debug!(
                        original_size = metrics.original_size,
                        compressed_size = metrics.compressed_size,
                        ratio = metrics.compression_ratio,
                        "Compressed state payload"
                    );
                }
                self.finish(data, true, metrics)
            }
            Err(e) => {
                tracing::error!(
                    original_size,
                    "Compression failed, storing uncompressed: {e}"
                );
                let metrics = CompressionMetrics::uncompressed(original_size);
                self.finish(text.to_string(), false, metrics)
            }
        }
    }

    fn finish(
        &self,
        data: String,
        compressed: bool,
        metrics: CompressionMetrics,
    ) -> CompressionOutput {
        self.sink.record(COMPRESS_OPERATION, &metrics.to_event());
        CompressionOutput {
            data,
            compressed,
            metrics,
        }
    }

    /// Reverse [`compress_if_needed`](Self::compress_if_needed).
    ///
    /// Uncompressed data (including entries whose flag is missing) is
    /// returned verbatim.
    pub fn decompress_if_needed(
        &self,
        data: &str,
        is_compressed: bool,
    ) -> Result<String, CompressionError> {
        if !is_compressed {
            return Ok(data.to_string());
        }

        let text = transform::decompress(data).map_err(|e| {
            tracing::error!(stored_size = char_units(data), "Decompression failed: {e}");
            CompressionError::new(data, e.to_string())
        })?;

        if self.dev_logging {
            let metrics = CompressionMetrics::compressed(char_units(&text), char_units(data));
            tracing::debug!(
                compressed_size = metrics.compressed_size,
                original_size = metrics.original_size,
                ratio = metrics.compression_ratio,
                "Decompressed state payload"
            );
        }

        Ok(text)
    }
}

impl std::fmt::Debug for CompressionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionCodec")
            .field("threshold", &self.threshold)
            .field("dev_logging", &self.dev_logging)
            .finish_non_exhaustive()
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::from_config(&PersistenceConfig::default(), Arc::new(NoopMetricsSink))
    }
}
