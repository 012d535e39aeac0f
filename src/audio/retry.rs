// Politique de nouvelle tentative pour l'ouverture du périphérique de sortie

use std::time::Duration;

/// Bounded retry with a linear backoff
///
/// Attempt `i` (from 0) waits `step_delay * i` before running, so the first
/// attempt is immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    step_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, step_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step_delay,
        }
    }

    /// Délai avant la tentative `attempt` (0 = première)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.step_delay * attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Indique s'il reste des tentatives après `attempt`
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100)) // 3 tentatives, 0 / 100 / 200 ms
    }
}
