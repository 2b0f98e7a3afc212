use serde::Serialize;
use std::sync::Mutex;

/// Counters for gateway and store activity.
pub struct MetricsRecorder {
    inner: Mutex<SyncMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncMetrics {
    pub fetch_attempts: usize,
    pub retries: usize,
    pub exhausted: usize,
    pub loads_committed: usize,
    pub loads_discarded: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SyncMetrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SyncMetrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_attempt(&self) {
        self.update(|m| m.fetch_attempts += 1);
    }

    pub fn record_retry(&self) {
        self.update(|m| m.retries += 1);
    }

    pub fn record_exhausted(&self) {
        self.update(|m| m.exhausted += 1);
    }

    pub fn record_committed(&self) {
        self.update(|m| m.loads_committed += 1);
    }

    pub fn record_discarded(&self) {
        self.update(|m| m.loads_discarded += 1);
    }

    pub fn snapshot(&self) -> SyncMetrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            SyncMetrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
