use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ScheduleError;

/// Bounded retry of a failed fire. `max_attempts: 1` means no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay_secs: 300,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_secs: delay.as_secs(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Whether a fire that failed on `attempt` (1-based) gets another try.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.max_attempts == 0 {
            return Err(ScheduleError::invalid("retry.max_attempts", "must be at least 1"));
        }
        Ok(())
    }
}
