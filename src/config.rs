//! Runtime configuration for the message handler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message handler configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HandlerConfig {
    /// Maximum tolerated delay, in seconds, between event emission and processing before
    /// the event is dropped.
    #[serde(default = "default_staleness_threshold_secs")]
    pub staleness_threshold_secs: u64,
    /// Delay, in seconds, requested from the queue harness before redelivering a message
    /// whose target table had to be created first.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl HandlerConfig {
    /// Default staleness threshold of 30 minutes.
    pub const DEFAULT_STALENESS_THRESHOLD_SECS: u64 = 30 * 60;

    /// Default redelivery delay of 10 minutes after a table creation.
    pub const DEFAULT_RETRY_DELAY_SECS: u64 = 10 * 60;

    /// Returns the staleness threshold as a signed duration for delivery age comparison.
    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_threshold_secs as i64)
    }

    /// Returns the redelivery delay requested after a table creation.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: default_staleness_threshold_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_staleness_threshold_secs() -> u64 {
    HandlerConfig::DEFAULT_STALENESS_THRESHOLD_SECS
}

fn default_retry_delay_secs() -> u64 {
    HandlerConfig::DEFAULT_RETRY_DELAY_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: HandlerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.staleness_threshold_secs, 30 * 60);
        assert_eq!(config.retry_delay_secs, 10 * 60);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: HandlerConfig =
            serde_json::from_str(r#"{"staleness_threshold_secs": 60, "retry_delay_secs": 5}"#)
                .unwrap();
        assert_eq!(config.staleness_threshold(), chrono::Duration::seconds(60));
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
    }
}
