use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Retry policy applied to every batch-write call.
///
/// The delay before retry `n` (zero based) is `min_timeout * factor^n`, optionally multiplied by a
/// random factor in `[1, 2)`, and capped at `max_timeout`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Number of additional attempts after the first one.
    ///
    /// Default: 0 (a single attempt)
    #[serde(default)]
    pub retries: u32,

    /// Exponential factor applied to the delay between attempts.
    ///
    /// Must be >= 1.0.
    /// Default: 2.0
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Delay before the first retry, in milliseconds.
    ///
    /// Default: 1000ms
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    ///
    /// Default: 60000ms
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Whether each delay is multiplied by a random factor in `[1, 2)`.
    ///
    /// Default: false
    #[serde(default)]
    pub randomize: bool,
}

fn default_factor() -> f64 {
    2.0
}

fn default_min_timeout_ms() -> u64 {
    1000
}

fn default_max_timeout_ms() -> u64 {
    60000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            factor: default_factor(),
            min_timeout_ms: default_min_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            randomize: false,
        }
    }
}

impl RetryConfig {
    /// Returns a default policy performing `retries` additional attempts.
    pub fn with_retries(retries: u32) -> Self {
        Self {
            retries,
            ..Self::default()
        }
    }

    pub fn min_timeout(&self) -> Duration {
        Duration::from_millis(self.min_timeout_ms)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }

    /// Validates the retry policy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.factor >= 1.0) {
            return Err(ValidationError::InvalidFieldValue {
                field: "retry.factor".to_string(),
                constraint: "must be greater than or equal to 1".to_string(),
            });
        }

        if self.min_timeout_ms > self.max_timeout_ms {
            return Err(ValidationError::InvalidFieldValue {
                field: "retry.min_timeout_ms".to_string(),
                constraint: "must not exceed `retry.max_timeout_ms`".to_string(),
            });
        }

        Ok(())
    }
}
