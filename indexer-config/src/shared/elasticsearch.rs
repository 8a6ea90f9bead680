use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

/// Connection settings for the search engine's bulk endpoint.
///
/// This intentionally does not implement [`serde::Serialize`] so the password cannot leak into
/// serialized output.
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. `https://search.internal:9200`.
    pub url: String,
    /// Username for basic authentication.
    #[serde(default)]
    pub username: Option<String>,
    /// Password for basic authentication.
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Timeout applied to each bulk request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl ElasticsearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates the connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ValidationError::InvalidElasticsearchUrl(self.url.clone()));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "elasticsearch.request_timeout_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
