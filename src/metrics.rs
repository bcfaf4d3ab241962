//! Command Metrics
//!
//! Counters and latency tracking for served commands.

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    total_ops: AtomicU64,

    /// Commands answered with an error response
    failed_ops: AtomicU64,

    ops_by_command: RwLock<HashMap<&'static str, u64>>,

    latency_sum_us: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_ops: AtomicU64::new(0),
            failed_ops: AtomicU64::new(0),
            ops_by_command: RwLock::new(HashMap::new()),
            latency_sum_us: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record a served command
    pub fn record_operation(&self, command: &'static str, latency: Duration, failed: bool) {
        self.total_ops.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_ops.fetch_add(1, Ordering::Relaxed);
        }

        *self.ops_by_command.write().entry(command).or_insert(0) += 1;

        let latency_us = latency.as_micros().min(u64::MAX as u128) as u64;
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops.load(Ordering::Relaxed)
    }

    pub fn failed_ops(&self) -> u64 {
        self.failed_ops.load(Ordering::Relaxed)
    }

    pub fn ops_by_command(&self) -> HashMap<&'static str, u64> {
        self.ops_by_command.read().clone()
    }

    /// Average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.total_ops();
        if count == 0 {
            return 0.0;
        }
        self.latency_sum_us.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn min_latency_us(&self) -> u64 {
        match self.latency_min_us.load(Ordering::Relaxed) {
            u64::MAX => 0,
            min => min,
        }
    }

    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Operations: {} ({} failed) | Latency (µs): avg={:.1}, min={}, max={}",
            self.total_ops(),
            self.failed_ops(),
            self.avg_latency_us(),
            self.min_latency_us(),
            self.max_latency_us()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_operation("GET", Duration::from_micros(100), false);
        metrics.record_operation("GET", Duration::from_micros(200), true);
        metrics.record_operation("SET", Duration::from_micros(150), false);

        assert_eq!(metrics.total_ops(), 3);
        assert_eq!(metrics.failed_ops(), 1);
        assert_eq!(metrics.min_latency_us(), 100);
        assert_eq!(metrics.max_latency_us(), 200);
        assert!((metrics.avg_latency_us() - 150.0).abs() < 0.1);

        let by_cmd = metrics.ops_by_command();
        assert_eq!(by_cmd.get("GET"), Some(&2));
        assert_eq!(by_cmd.get("SET"), Some(&1));
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::new();
        assert_eq!(metrics.min_latency_us(), 0);
        assert_eq!(metrics.avg_latency_us(), 0.0);
        assert!(metrics.summary().starts_with("Operations: 0"));
    }
}
