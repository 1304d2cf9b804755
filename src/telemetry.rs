//! Pipeline statistics collector.
//!
//! A small global hub of atomic counters fed by the engine on its hot path.
//! Counters aggregate across every pipeline in the process; `snapshot()`
//! serializes them for CLI reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Global stats hub shared across the crate.
static HUB: Lazy<PipelineStats> = Lazy::new(PipelineStats::default);

/// Access the global stats hub.
pub fn hub() -> &'static PipelineStats {
    &HUB
}

/// Serializable snapshot of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub chunks_processed: u64,
    pub peaks_kept: u64,
    pub events_generated: u64,
    pub matches_fired: u64,
}

/// Lock-free counters over the detection hot path.
#[derive(Debug, Default)]
pub struct PipelineStats {
    chunks_processed: AtomicU64,
    peaks_kept: AtomicU64,
    events_generated: AtomicU64,
    matches_fired: AtomicU64,
}

impl PipelineStats {
    pub fn record_chunk(&self) {
        self.chunks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peaks(&self, count: usize) {
        self.peaks_kept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_events(&self, count: usize) {
        self.events_generated
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_match(&self) {
        self.matches_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            peaks_kept: self.peaks_kept.load(Ordering::Relaxed),
            events_generated: self.events_generated.load(Ordering::Relaxed),
            matches_fired: self.matches_fired.load(Ordering::Relaxed),
        }
    }
}
