//! Session loop configuration from TOML (`[session]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolpod_application::ExecutionParams;
use toolpod_domain::{ConfigIssue, ConfigIssueCode};

/// Raw session configuration from TOML
///
/// # Example
///
/// ```toml
/// [session]
/// turn_limit = 20
/// fan_out = 4
/// call_timeout_secs = 30
/// acquire_retries = 2
/// acquire_backoff_ms = 200
/// sub_agent_turn_limit = 8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    /// Maximum model round trips per session
    pub turn_limit: usize,
    /// Maximum concurrency-safe calls in flight within a turn
    pub fan_out: usize,
    /// Default per-call timeout in seconds
    pub call_timeout_secs: u64,
    /// Extra instance acquisition attempts after a provisioning failure
    pub acquire_retries: usize,
    /// Delay before the first acquisition retry, in milliseconds
    pub acquire_backoff_ms: u64,
    /// Turn limit for `agent` sub-sessions
    pub sub_agent_turn_limit: usize,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            turn_limit: params.turn_limit,
            fan_out: params.fan_out,
            call_timeout_secs: params.call_timeout.as_secs(),
            acquire_retries: params.acquire_retries,
            acquire_backoff_ms: params.acquire_backoff.as_millis() as u64,
            sub_agent_turn_limit: params.sub_agent_turn_limit,
        }
    }
}

impl FileSessionConfig {
    /// Convert to [`ExecutionParams`], reporting values that cannot work.
    ///
    /// Zero limits are errors; the returned params fall back to the defaults
    /// for those fields so callers that only warn still get a usable value.
    pub fn to_execution_params(&self) -> (ExecutionParams, Vec<ConfigIssue>) {
        let defaults = ExecutionParams::default();
        let mut issues = Vec::new();

        let mut positive = |field: &str, value: u64| -> bool {
            if value == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidValue {
                        field: format!("session.{}", field),
                        value: "0".to_string(),
                    },
                    format!("session.{} must be at least 1", field),
                ));
                false
            } else {
                true
            }
        };

        let turn_limit = if positive("turn_limit", self.turn_limit as u64) {
            self.turn_limit
        } else {
            defaults.turn_limit
        };
        let fan_out = if positive("fan_out", self.fan_out as u64) {
            self.fan_out
        } else {
            defaults.fan_out
        };
        let call_timeout = if positive("call_timeout_secs", self.call_timeout_secs) {
            Duration::from_secs(self.call_timeout_secs)
        } else {
            defaults.call_timeout
        };
        let sub_agent_turn_limit =
            if positive("sub_agent_turn_limit", self.sub_agent_turn_limit as u64) {
                self.sub_agent_turn_limit
            } else {
                defaults.sub_agent_turn_limit
            };

        let params = ExecutionParams::default()
            .with_turn_limit(turn_limit)
            .with_fan_out(fan_out)
            .with_call_timeout(call_timeout)
            .with_acquire_retries(self.acquire_retries)
            .with_acquire_backoff(Duration::from_millis(self.acquire_backoff_ms))
            .with_sub_agent_turn_limit(sub_agent_turn_limit);

        (params, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_execution_params() {
        let (params, issues) = FileSessionConfig::default().to_execution_params();
        assert!(issues.is_empty());
        assert_eq!(params, ExecutionParams::default());
    }

    #[test]
    fn test_custom_values() {
        let config = FileSessionConfig {
            turn_limit: 5,
            fan_out: 2,
            call_timeout_secs: 3,
            acquire_retries: 0,
            acquire_backoff_ms: 10,
            sub_agent_turn_limit: 2,
        };
        let (params, issues) = config.to_execution_params();
        assert!(issues.is_empty());
        assert_eq!(params.turn_limit, 5);
        assert_eq!(params.fan_out, 2);
        assert_eq!(params.call_timeout, Duration::from_secs(3));
        assert_eq!(params.acquire_retries, 0);
        assert_eq!(params.acquire_backoff, Duration::from_millis(10));
        assert_eq!(params.sub_agent_turn_limit, 2);
    }

    #[test]
    fn test_zero_values_are_errors() {
        let config = FileSessionConfig {
            turn_limit: 0,
            fan_out: 0,
            ..Default::default()
        };
        let (params, issues) = config.to_execution_params();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.is_error()));
        assert!(issues[0].message.contains("session.turn_limit"));
        assert!(issues[1].message.contains("session.fan_out"));
        // Falls back to defaults
        assert_eq!(params.turn_limit, 20);
        assert_eq!(params.fan_out, 4);
    }
}
