//! Stream health counters and periodic diagnostics
//!
//! Counters are bumped from both the producer (push) and the device pull
//! context, so they are plain relaxed atomics. The producer side owns a
//! [`MetricsLog`] that prints per-second deltas.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::debug;

/// Interval between diagnostic log lines
const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Shared stream counters
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    samples_pushed: AtomicU64,
    samples_pulled: AtomicU64,
    underruns: AtomicU64,
    silence_inserted: AtomicU64,
    overruns: AtomicU64,
    samples_discarded: AtomicU64,
    dropped_batches: AtomicU64,
}

impl StreamCounters {
    pub fn record_push(&self, written: usize, discarded: usize) {
        self.samples_pushed.fetch_add(written as u64, Ordering::Relaxed);
        if discarded > 0 {
            self.overruns.fetch_add(1, Ordering::Relaxed);
            self.samples_discarded
                .fetch_add(discarded as u64, Ordering::Relaxed);
        }
    }

    pub fn record_pull(&self, delivered: usize, requested: usize) {
        self.samples_pulled
            .fetch_add(delivered as u64, Ordering::Relaxed);
        if delivered < requested {
            self.underruns.fetch_add(1, Ordering::Relaxed);
            self.silence_inserted
                .fetch_add((requested - delivered) as u64, Ordering::Relaxed);
        }
    }

    /// Samples still queued when the ring was released; not an overrun
    pub fn record_flush(&self, resident: usize) {
        self.samples_discarded
            .fetch_add(resident as u64, Ordering::Relaxed);
    }

    /// Returns the running total of dropped batches, this one included
    pub fn record_dropped_batch(&self) -> u64 {
        self.dropped_batches.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> StreamStats {
        StreamStats {
            samples_pushed: self.samples_pushed.load(Ordering::Relaxed),
            samples_pulled: self.samples_pulled.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            silence_inserted: self.silence_inserted.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            dropped_batches: self.dropped_batches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the stream counters
///
/// All sample counts are in device samples (a stereo frame counts as 2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Samples queued by the producer after conversion
    pub samples_pushed: u64,
    /// Samples delivered to the device from the ring
    pub samples_pulled: u64,
    /// Pull callbacks that found fewer samples than requested
    pub underruns: u64,
    /// Silent samples written to cover underruns
    pub silence_inserted: u64,
    /// Pushes that had to discard older audio
    pub overruns: u64,
    /// Samples lost to overruns
    pub samples_discarded: u64,
    /// Batches rejected because no conversion path exists
    pub dropped_batches: u64,
}

impl StreamStats {
    fn delta(&self, earlier: &Self) -> Self {
        Self {
            samples_pushed: self.samples_pushed - earlier.samples_pushed,
            samples_pulled: self.samples_pulled - earlier.samples_pulled,
            underruns: self.underruns - earlier.underruns,
            silence_inserted: self.silence_inserted - earlier.silence_inserted,
            overruns: self.overruns - earlier.overruns,
            samples_discarded: self.samples_discarded - earlier.samples_discarded,
            dropped_batches: self.dropped_batches - earlier.dropped_batches,
        }
    }
}

/// Producer-side periodic logger
#[derive(Debug)]
pub(crate) struct MetricsLog {
    last_log_time: Instant,
    last: StreamStats,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self {
            last_log_time: Instant::now(),
            last: StreamStats::default(),
        }
    }

    /// Log per-interval deltas if enough time has passed
    pub fn maybe_log(&mut self, counters: &StreamCounters, buffer_fill: usize, capacity: usize) {
        if self.last_log_time.elapsed() < LOG_INTERVAL {
            return;
        }

        let now = counters.snapshot();
        let delta = now.delta(&self.last);
        let buffer_pct = if capacity > 0 {
            (buffer_fill as f64 / capacity as f64) * 100.0
        } else {
            0.0
        };

        debug!(
            "AUDIO STREAM: buf={:.1}% ({} samples), pushed={}, pulled={}, \
             underruns={} (+{} silent), overruns={} (-{} samples), dropped_batches={}",
            buffer_pct,
            buffer_fill,
            delta.samples_pushed,
            delta.samples_pulled,
            delta.underruns,
            delta.silence_inserted,
            delta.overruns,
            delta.samples_discarded,
            delta.dropped_batches
        );

        self.last = now;
        self.last_log_time = Instant::now();
    }
}
