//! Run-wide statistics.
//!
//! The aggregator is written concurrently by the arrival generator (arrivals) and by every
//! consultant (outcomes) using relaxed atomic increments, and may be read at any time. Reads taken
//! while writers are active are individually untorn but not mutually consistent; take the final
//! report only after the writers have been joined.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters shared by every role of one run.
///
/// Passed explicitly to the generator and the consultants; separate runs (and tests) each build
/// their own.
#[derive(Debug)]
pub struct StatsAggregator {
    arrivals: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    started: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub arrivals: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_processed: u64,
    pub success_rate: f64,
    pub elapsed_ms: u64,
    pub throughput_per_sec: f64,
}

impl StatsSnapshot {
    fn from_counts(arrivals: u64, successful: u64, failed: u64, elapsed: Duration) -> Self {
        let total_processed = successful + failed;
        let success_rate = if total_processed == 0 {
            0.0
        } else {
            successful as f64 * 100.0 / total_processed as f64
        };
        let secs = elapsed.as_secs_f64();
        let throughput_per_sec = if secs > 0.0 {
            total_processed as f64 / secs
        } else {
            0.0
        };
        Self {
            arrivals,
            successful,
            failed,
            total_processed,
            success_rate,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            throughput_per_sec,
        }
    }
}

impl StatsAggregator {
    /// Create zeroed counters; the throughput clock starts now.
    pub fn new() -> Self {
        Self {
            arrivals: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Count a patient that has been placed on its queue.
    pub fn record_arrival(&self) {
        self.arrivals.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a treatment that ended well.
    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a treatment that failed. The patient is still considered seen.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn arrivals(&self) -> u64 {
        self.arrivals.load(Ordering::Relaxed)
    }

    pub fn successful(&self) -> u64 {
        self.successful.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total_processed(&self) -> u64 {
        self.successful() + self.failed()
    }

    /// Percentage of processed patients with a successful outcome; `0.0` before any outcome.
    pub fn success_rate(&self) -> f64 {
        let successful = self.successful();
        let total = successful + self.failed();
        if total == 0 {
            return 0.0;
        }
        successful as f64 * 100.0 / total as f64
    }

    /// Processed patients per second over `elapsed`; `0.0` for a zero interval.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_processed() as f64 / secs
    }

    /// Time since the aggregator was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Copy the counters, loading each one once so the derived fields agree with each other.
    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.elapsed();
        let successful = self.successful();
        let failed = self.failed();
        StatsSnapshot::from_counts(self.arrivals(), successful, failed, elapsed)
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn success_rate_is_zero_without_outcomes() {
        let stats = StatsAggregator::new();
        assert_eq!(stats.success_rate(), 0.0);
        assert_eq!(stats.total_processed(), 0);
        assert_eq!(stats.throughput(Duration::ZERO), 0.0);
    }

    #[test]
    fn success_rate_and_throughput() {
        let stats = StatsAggregator::new();
        for _ in 0..3 {
            stats.record_success();
        }
        stats.record_failure();
        assert_eq!(stats.total_processed(), 4);
        assert!((stats.success_rate() - 75.0).abs() < f64::EPSILON);
        assert!((stats.throughput(Duration::from_secs(2)) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        stats.record_success();
                        stats.record_arrival();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.successful, 8_000);
        assert_eq!(snapshot.arrivals, 8_000);
        assert_eq!(snapshot.failed, 0);
    }

    #[test]
    fn snapshot_fields_agree_under_concurrent_writes() {
        let stats = Arc::new(StatsAggregator::new());
        let writer = {
            let stats = stats.clone();
            thread::spawn(move || {
                for i in 0..20_000 {
                    if i % 3 == 0 {
                        stats.record_failure();
                    } else {
                        stats.record_success();
                    }
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = stats.snapshot();
            assert_eq!(
                snapshot.total_processed,
                snapshot.successful + snapshot.failed
            );
            if snapshot.total_processed > 0 {
                let expected =
                    snapshot.successful as f64 * 100.0 / snapshot.total_processed as f64;
                assert!((snapshot.success_rate - expected).abs() < 1e-9);
            } else {
                assert_eq!(snapshot.success_rate, 0.0);
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn independent_aggregators_do_not_share_state() {
        let a = StatsAggregator::new();
        let b = StatsAggregator::new();
        a.record_success();
        assert_eq!(a.successful(), 1);
        assert_eq!(b.successful(), 0);
    }
}
