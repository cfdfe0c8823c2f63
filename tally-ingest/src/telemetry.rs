use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::orchestrator::Provenance;

/// Per-file record for debug and observability surfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    /// Whether a remote extractor was configured.
    pub enabled: bool,
    pub processor_identifier: Option<String>,
    /// Remote call latency, when one was made.
    pub latency_ms: Option<u64>,
    pub entity_count: usize,
    /// Last source attempted: `local` or `remote`.
    pub attempted_source: Option<String>,
    pub lines_segmented: usize,
    /// Garbage lines plus lines the grammar declined.
    pub lines_skipped: usize,
    pub local_latency_ms: Option<u64>,
}

/// Process-wide outcome counters. The only state shared across ingestions.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    files: AtomicU64,
    local: AtomicU64,
    remote: AtomicU64,
    none: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub files: u64,
    pub local: u64,
    pub remote: u64,
    pub none: u64,
}

impl IngestMetrics {
    pub const fn new() -> Self {
        Self {
            files: AtomicU64::new(0),
            local: AtomicU64::new(0),
            remote: AtomicU64::new(0),
            none: AtomicU64::new(0),
        }
    }

    pub fn record(&self, provenance: Provenance) {
        self.files.fetch_add(1, Ordering::Relaxed);
        let bucket = match provenance {
            Provenance::Local => &self.local,
            Provenance::Remote => &self.remote,
            Provenance::None => &self.none,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files: self.files.load(Ordering::Relaxed),
            local: self.local.load(Ordering::Relaxed),
            remote: self.remote.load(Ordering::Relaxed),
            none: self.none.load(Ordering::Relaxed),
        }
    }
}

pub static METRICS: IngestMetrics = IngestMetrics::new();
