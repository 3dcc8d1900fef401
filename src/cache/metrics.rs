//! Per-instance cache metrics
//!
//! Counters are atomics so the hot path never waits on a lock; latency
//! windows sit behind a short-lived mutex.

use crate::cache::types::{CacheStats, LatencySummary};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Running counters and latency windows owned by one cache instance
#[derive(Debug)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
    writes: AtomicU64,
    write_errors: AtomicU64,
    hit_latency: LatencyWindow,
    miss_latency: LatencyWindow,
}

impl CacheMetrics {
    /// Create metrics retaining up to `window` latency samples per outcome
    pub fn new(window: usize) -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            hit_latency: LatencyWindow::new(window),
            miss_latency: LatencyWindow::new(window),
        }
    }

    pub fn record_hit(&self, latency: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.hit_latency.record(latency);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Time spent producing a result after a miss
    pub fn record_miss_latency(&self, latency: Duration) {
        self.miss_latency.record(latency);
    }

    /// Snapshot the counters and latency percentiles
    pub fn snapshot(&self, active: bool) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            active,
            hits,
            misses,
            errors: self.errors.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            hit_latency: self.hit_latency.summary(),
            miss_latency: self.miss_latency.summary(),
        }
    }

    /// Zero every counter and drop all latency samples
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
        self.hit_latency.clear();
        self.miss_latency.clear();
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new(1_000)
    }
}

/// Bounded FIFO of latency samples in milliseconds
#[derive(Debug)]
struct LatencyWindow {
    capacity: usize,
    samples: Mutex<VecDeque<f64>>,
}

impl LatencyWindow {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn record(&self, latency: Duration) {
        // A panic while holding the lock cannot leave a VecDeque of floats
        // in an invalid state, so a poisoned lock is still usable.
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(latency.as_secs_f64() * 1000.0);
    }

    fn clear(&self) {
        self.samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn summary(&self) -> LatencySummary {
        let mut sorted: Vec<f64> = self
            .samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect();
        sorted.sort_by(f64::total_cmp);

        LatencySummary {
            samples: sorted.len(),
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
        }
    }
}

/// Nearest-rank percentile over sorted samples; 0.0 when empty
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_hit_rate() {
        let metrics = CacheMetrics::new(10);
        metrics.record_hit(Duration::from_millis(2));
        metrics.record_hit(Duration::from_millis(4));
        metrics.record_hit(Duration::from_millis(6));
        metrics.record_miss();
        metrics.record_error();

        let stats = metrics.snapshot(true);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_lookups(), 5);
        // errors are excluded from the hit-rate denominator
        assert_eq!(stats.hit_rate, 0.75);
        assert_eq!(stats.hit_latency.samples, 3);
    }

    #[test]
    fn test_zero_lookups() {
        let stats = CacheMetrics::default().snapshot(false);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.hit_latency, LatencySummary::default());
        assert!(!stats.active);
    }

    #[test]
    fn test_percentiles() {
        let metrics = CacheMetrics::new(100);
        for ms in 1..=100 {
            metrics.record_miss_latency(Duration::from_millis(ms));
        }

        let summary = metrics.snapshot(true).miss_latency;
        assert_eq!(summary.samples, 100);
        assert!((summary.p50_ms - 50.0).abs() < 1e-6);
        assert!((summary.p95_ms - 95.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_bounded() {
        let metrics = CacheMetrics::new(3);
        for ms in [1000, 1000, 1000, 1, 2, 3] {
            metrics.record_hit(Duration::from_millis(ms));
        }

        let stats = metrics.snapshot(true);
        assert_eq!(stats.hits, 6);
        assert_eq!(stats.hit_latency.samples, 3);
        assert!(stats.hit_latency.p95_ms < 10.0);
    }

    #[test]
    fn test_reset() {
        let metrics = CacheMetrics::new(10);
        metrics.record_hit(Duration::from_millis(1));
        metrics.record_miss();
        metrics.record_write();
        metrics.record_write_error();
        metrics.record_miss_latency(Duration::from_millis(5));

        metrics.reset();
        let stats = metrics.snapshot(true);
        assert_eq!(stats.total_lookups(), 0);
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(stats.miss_latency.samples, 0);
    }

    #[test]
    fn test_percentile_single_sample() {
        assert_eq!(percentile(&[7.0], 50.0), 7.0);
        assert_eq!(percentile(&[7.0], 95.0), 7.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
    }
}
