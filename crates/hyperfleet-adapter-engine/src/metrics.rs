//! Adapter-health metrics: three gauges exposing the unix timestamp of the
//! last event processed, last successful run, and last failed run. Kept as atomics
//! rather than behind a lock since the only operation is "store the current time".

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    last_processed_unix: AtomicU64,
    last_success_unix: AtomicU64,
    last_failure_unix: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self, now_unix: u64) {
        self.last_processed_unix.store(now_unix, Ordering::Relaxed);
    }

    pub fn record_success(&self, now_unix: u64) {
        self.last_success_unix.store(now_unix, Ordering::Relaxed);
    }

    pub fn record_failure(&self, now_unix: u64) {
        self.last_failure_unix.store(now_unix, Ordering::Relaxed);
    }

    pub fn last_processed_unix(&self) -> u64 {
        self.last_processed_unix.load(Ordering::Relaxed)
    }

    pub fn last_success_unix(&self) -> u64 {
        self.last_success_unix.load(Ordering::Relaxed)
    }

    pub fn last_failure_unix(&self) -> u64 {
        self.last_failure_unix.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_independently() {
        let m = Metrics::new();
        m.record_processed(100);
        m.record_success(100);
        m.record_failure(90);
        assert_eq!(m.last_processed_unix(), 100);
        assert_eq!(m.last_success_unix(), 100);
        assert_eq!(m.last_failure_unix(), 90);
    }
}
