use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Counters kept by the scheduler actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    pub submitted: u64,
    pub dispatched: u64,
    pub windows: u64,
    pub succeeded: u64,
    pub throttled: u64,
    pub retried: u64,
    pub failed: u64,
    pub queue_depth: usize,
    pub in_flight: usize,
    pub started_at: u64,
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self {
            submitted: 0,
            dispatched: 0,
            windows: 0,
            succeeded: 0,
            throttled: 0,
            retried: 0,
            failed: 0,
            queue_depth: 0,
            in_flight: 0,
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

impl SchedulerMetrics {
    pub fn record_window(&mut self, batch_size: usize) {
        self.windows += 1;
        self.dispatched += batch_size as u64;
        self.in_flight += batch_size;
    }

    pub fn record_completion(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Requests resolved one way or another
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed
    }
}
