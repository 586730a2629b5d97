//! Reconnection backoff configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Stream reconnection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on the delay between attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Consecutive reconnection attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

const fn default_initial_delay_ms() -> u64 {
    1000 // 1 second
}

const fn default_max_delay_ms() -> u64 {
    30_000 // 30 seconds
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_max_attempts() -> u32 {
    5
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectionConfig {
    /// Delay before reconnection attempt `attempt` (0-indexed).
    ///
    /// `min(initial * multiplier^attempt, max)`, saturating instead of
    /// overflowing for large attempt counts.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = if scaled.is_finite() {
            scaled.min(self.max_delay_ms as f64) as u64
        } else {
            self.max_delay_ms
        };
        Duration::from_millis(capped)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: format!(
                    "{} exceeds max_delay_ms ({})",
                    self.initial_delay_ms, self.max_delay_ms
                ),
            });
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: format!("{} must be at least 1.0", self.backoff_multiplier),
            });
        }
        Ok(())
    }
}
