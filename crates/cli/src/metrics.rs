//! Prometheus metrics snapshot.
//!
//! The engine records its counters in `elective_core::metrics`; this module
//! gathers them into one registry and renders the text exposition format so
//! a run can leave a snapshot behind for node-exporter style collectors.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

fn register_metrics(registry: &Registry) {
    for metric in elective_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

/// Write the current metrics to `path`, replacing any previous snapshot.
pub fn write_snapshot(path: &Path) -> Result<()> {
    let text = encode_metrics()?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics snapshot to {:?}", path))
}
