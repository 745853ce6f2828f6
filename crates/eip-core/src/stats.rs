// # Execution Statistics
//
// Rolling performance counters shared by provider implementations.
//
// Only successful executions are counted. The duration window keeps the
// `DURATION_WINDOW` most recent successes, evicting the oldest first.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Number of recent successful durations kept per provider
pub const DURATION_WINDOW: usize = 10;

/// Success counter plus a bounded window of recent durations
///
/// # Example
///
/// ```rust
/// use eip_core::stats::ExecutionStats;
/// use std::time::Duration;
///
/// let stats = ExecutionStats::new();
/// stats.record_success(Duration::from_millis(20));
/// stats.record_success(Duration::from_millis(40));
///
/// assert_eq!(stats.successful_execution_count(), 2);
/// assert_eq!(stats.average_duration(), Duration::from_millis(30));
/// ```
#[derive(Debug, Default)]
pub struct ExecutionStats {
    inner: Mutex<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    successful_executions: u64,
    recent_durations: VecDeque<Duration>,
}

impl ExecutionStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful execution
    pub fn record_success(&self, elapsed: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.recent_durations.push_back(elapsed);
        while inner.recent_durations.len() > DURATION_WINDOW {
            inner.recent_durations.pop_front();
        }
        inner.successful_executions += 1;
    }

    /// Time `operation`, recording its duration only if it succeeds
    pub async fn measure<F, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = operation.await;
        if result.is_ok() {
            self.record_success(start.elapsed());
        }
        result
    }

    /// Total successful executions, regardless of the window size
    pub fn successful_execution_count(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .successful_executions
    }

    /// Mean of the durations currently in the window
    ///
    /// Zero when nothing has succeeded yet.
    pub fn average_duration(&self) -> Duration {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let len = inner.recent_durations.len() as u32;
        if len == 0 {
            return Duration::ZERO;
        }
        inner.recent_durations.iter().sum::<Duration>() / len
    }

    /// Durations currently in the window, oldest first
    pub fn recent_durations(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent_durations
            .iter()
            .copied()
            .collect()
    }
}
