//! Execution parameters: orchestration loop control.
//!
//! [`ExecutionParams`] groups the static parameters that control the
//! tool-calling loop in [`RunSessionUseCase`](crate::use_cases::run_session::RunSessionUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestration loop control parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum model round trips before the session ends with TurnLimitExceeded.
    pub turn_limit: usize,
    /// Maximum concurrency-safe calls in flight at once within a turn.
    pub fan_out: usize,
    /// Default per-call timeout; a tool descriptor may override it.
    pub call_timeout: Duration,
    /// Extra acquisition attempts after an instance creation failure.
    pub acquire_retries: usize,
    /// Delay before the first acquisition retry; doubles on each attempt.
    pub acquire_backoff: Duration,
    /// Turn limit for nested sub-agent sessions.
    pub sub_agent_turn_limit: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            turn_limit: 20,
            fan_out: 4,
            call_timeout: Duration::from_secs(30),
            acquire_retries: 2,
            acquire_backoff: Duration::from_millis(200),
            sub_agent_turn_limit: 8,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_turn_limit(mut self, limit: usize) -> Self {
        self.turn_limit = limit;
        self
    }

    /// Set the fan-out limit. Values below 1 are raised to 1.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_acquire_retries(mut self, retries: usize) -> Self {
        self.acquire_retries = retries;
        self
    }

    pub fn with_acquire_backoff(mut self, backoff: Duration) -> Self {
        self.acquire_backoff = backoff;
        self
    }

    pub fn with_sub_agent_turn_limit(mut self, limit: usize) -> Self {
        self.sub_agent_turn_limit = limit;
        self
    }

    /// Backoff before retry number `attempt` (zero-based).
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        self.acquire_backoff.saturating_mul(1u32 << attempt.min(16) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.turn_limit, 20);
        assert_eq!(params.fan_out, 4);
        assert_eq!(params.call_timeout, Duration::from_secs(30));
        assert_eq!(params.acquire_retries, 2);
        assert_eq!(params.sub_agent_turn_limit, 8);
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_turn_limit(3)
            .with_fan_out(0)
            .with_call_timeout(Duration::from_millis(50))
            .with_acquire_retries(0);
        assert_eq!(params.turn_limit, 3);
        assert_eq!(params.fan_out, 1);
        assert_eq!(params.call_timeout, Duration::from_millis(50));
        assert_eq!(params.acquire_retries, 0);
    }

    #[test]
    fn test_backoff_doubles() {
        let params = ExecutionParams::default().with_acquire_backoff(Duration::from_millis(100));
        assert_eq!(params.backoff_for(0), Duration::from_millis(100));
        assert_eq!(params.backoff_for(1), Duration::from_millis(200));
        assert_eq!(params.backoff_for(2), Duration::from_millis(400));
    }
}
