//! Retry-governed submission of an assembled batch.

use std::time::Duration;

use indexer_config::shared::RetryConfig;
use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::client::BulkClient;
use crate::error::IndexerResult;
use crate::types::{BulkRequest, BulkResponse};

/// Retry policy of the batch-write call, derived from a [`RetryConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub retries: u32,
    pub factor: f64,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    pub randomize: bool,
}

impl RetryPolicy {
    /// Returns the total number of attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Returns the delay to wait before retry number `attempt`, counting from zero.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let random = if self.randomize {
            rand::thread_rng().gen_range(1.0..2.0)
        } else {
            1.0
        };

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.min_timeout.as_secs_f64() * self.factor.powi(exponent) * random;

        if delay.is_finite() && delay < self.max_timeout.as_secs_f64() {
            Duration::from_secs_f64(delay)
        } else {
            self.max_timeout
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            factor: config.factor,
            min_timeout: config.min_timeout(),
            max_timeout: config.max_timeout(),
            randomize: config.randomize,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Submits `request` to `client`, repeating the whole request on failure.
///
/// Makes at most `policy.retries + 1` calls. When every call fails, the error of the last call
/// is returned unchanged.
pub async fn dispatch<C>(
    client: &C,
    request: BulkRequest,
    policy: &RetryPolicy,
) -> IndexerResult<BulkResponse>
where
    C: BulkClient,
{
    let max_attempts = policy.max_attempts();
    let actions = request.action_count();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match client.bulk(request.clone()).await {
            Ok(response) => {
                info!(
                    client = C::name(),
                    attempt,
                    actions,
                    took = response.took,
                    errors = response.errors,
                    "bulk request dispatched"
                );

                return Ok(response);
            }
            Err(err) if attempt < max_attempts => {
                let backoff = policy.backoff(attempt - 1);
                warn!(
                    client = C::name(),
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis(),
                    error = %err,
                    "bulk request failed, backing off before retry"
                );

                sleep(backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;
    use crate::client::memory::MemoryBulkClient;
    use crate::error::ErrorKind;
    use crate::indexer_error;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            min_timeout: Duration::ZERO,
            max_timeout: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    fn request() -> BulkRequest {
        BulkRequest {
            options: Map::new(),
            body: vec![json!({"delete": {"_index": "i", "_id": "k1"}})],
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            retries: 5,
            factor: 2.0,
            min_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_millis(500),
            randomize: false,
        };

        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(500));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn randomized_backoff_stays_within_bounds() {
        let policy = RetryPolicy {
            randomize: true,
            min_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_secs(10),
            ..RetryPolicy::default()
        };

        for _ in 0..32 {
            let backoff = policy.backoff(0);
            assert!(backoff >= Duration::from_millis(100));
            assert!(backoff <= Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn single_attempt_without_retries() {
        let client = MemoryBulkClient::new();
        let err = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "down");
        client.fail_always(err.clone()).await;

        let result = dispatch(&client, request(), &policy(0)).await;

        assert_eq!(result.unwrap_err(), err);
        assert_eq!(client.calls().await, 1);
    }

    #[tokio::test]
    async fn surfaces_the_last_error_after_retries() {
        let client = MemoryBulkClient::new();
        let first = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "first");
        let last = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "last");
        client.fail_next(first).await;
        client.fail_always(last.clone()).await;

        let err = dispatch(&client, request(), &policy(3)).await.unwrap_err();

        assert_eq!(err, last);
        assert_eq!(err.location(), last.location());
        assert_eq!(client.calls().await, 4);
        assert!(client.requests().await.iter().all(|r| r == &request()));
    }

    #[tokio::test]
    async fn stops_retrying_after_success() {
        let client = MemoryBulkClient::new();
        client
            .fail_next(indexer_error!(ErrorKind::DestinationConnectionFailed, "Unreachable"))
            .await;

        let response = dispatch(&client, request(), &policy(5)).await.unwrap();

        assert!(!response.errors);
        assert_eq!(client.calls().await, 2);
    }
}
