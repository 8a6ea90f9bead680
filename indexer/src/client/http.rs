use indexer_config::shared::ElasticsearchConfig;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error};

use crate::bail;
use crate::client::BulkClient;
use crate::error::{ErrorKind, IndexerResult};
use crate::field::value_to_string;
use crate::types::{BulkRequest, BulkResponse};

/// Content type of the bulk endpoint body.
const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Maximum number of response body bytes attached to a failure.
const MAX_ERROR_BODY_LEN: usize = 2048;

/// Client posting batch-write calls to the `_bulk` endpoint of a search engine cluster.
///
/// The body is sent as newline delimited JSON, one line per action or document. Extra request
/// options become query parameters.
#[derive(Debug, Clone)]
pub struct HttpBulkClient {
    client: reqwest::Client,
    endpoint: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl HttpBulkClient {
    /// Creates a client for the cluster described by `config`.
    pub fn new(config: &ElasticsearchConfig) -> IndexerResult<Self> {
        if let Err(err) = config.validate() {
            bail!(
                ErrorKind::InvalidConfiguration,
                "Invalid search engine connection settings",
                err,
                source: err
            );
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/_bulk", config.url.trim_end_matches('/')),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Returns the URL of the bulk endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BulkClient for HttpBulkClient {
    fn name() -> &'static str {
        "http"
    }

    async fn bulk(&self, request: BulkRequest) -> IndexerResult<BulkResponse> {
        let body = encode_ndjson(&request)?;
        let query = request
            .options
            .iter()
            .map(|(key, value)| (key.clone(), value_to_string(value)))
            .collect::<Vec<_>>();

        debug!(
            endpoint = %self.endpoint,
            actions = request.action_count(),
            bytes = body.len(),
            "sending bulk request"
        );

        let mut builder = self
            .client
            .post(&self.endpoint)
            .query(&query)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(body);

        if let Some(username) = &self.username {
            builder = builder.basic_auth(
                username,
                self.password.as_ref().map(|password| password.expose_secret()),
            );
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let body = truncate(&body, MAX_ERROR_BODY_LEN);
            error!(%status, body, "bulk request rejected");

            bail!(
                ErrorKind::DispatchFailed,
                "Bulk request rejected",
                format!("bulk endpoint returned status {status}: {body}")
            );
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Encodes every body line as compact JSON followed by a newline.
fn encode_ndjson(request: &BulkRequest) -> IndexerResult<String> {
    let mut body = String::new();
    for line in &request.body {
        body.push_str(&serde_json::to_string(line)?);
        body.push('\n');
    }

    Ok(body)
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((position, _)) => &s[..position],
        None => s,
    }
}
