//! Decompression Statistics
//!
//! Read paths report how much compressed data they pulled apart so the
//! surrounding store can account for query cost. Each per-block iterator adds
//! its counters exactly once, when it closes.
//!
//! The sink travels with a [`StatsContext`]: a cheap, cloneable handle that
//! either points at a shared [`DecompressionStats`] or at nothing, in which
//! case recording is a no-op.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Shared decompression counters, updated atomically
#[derive(Debug, Default)]
pub struct DecompressionStats {
    bytes_decompressed: AtomicI64,
    bytes_compressed: AtomicI64,
}

impl DecompressionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one iterator's counters
    pub fn record(&self, decompressed: i64, compressed: i64) {
        self.bytes_decompressed
            .fetch_add(decompressed, Ordering::Relaxed);
        self.bytes_compressed.fetch_add(compressed, Ordering::Relaxed);
    }

    pub fn bytes_decompressed(&self) -> i64 {
        self.bytes_decompressed.load(Ordering::Relaxed)
    }

    pub fn bytes_compressed(&self) -> i64 {
        self.bytes_compressed.load(Ordering::Relaxed)
    }
}

/// Handle passed into chunk iteration; carries an optional stats sink
#[derive(Debug, Clone, Default)]
pub struct StatsContext {
    stats: Option<Arc<DecompressionStats>>,
}

impl StatsContext {
    /// A context with no sink attached; recording is a no-op
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that accumulates into the given sink
    pub fn with_stats(stats: Arc<DecompressionStats>) -> Self {
        Self { stats: Some(stats) }
    }

    pub fn record(&self, decompressed: i64, compressed: i64) {
        if let Some(stats) = &self.stats {
            stats.record(decompressed, compressed);
        }
    }
}
