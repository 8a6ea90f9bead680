use std::path::Path;

use indexer::client::http::HttpBulkClient;
use indexer::options::PipelineOptions;
use indexer::pipeline::Pipeline;
use indexer::types::{InvocationContext, InvocationOutcome};
use indexer_config::shared::ReplicatorConfig;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use crate::error::{ReplicatorError, ReplicatorResult};

/// Builds a pipeline from `config` and runs a single invocation on `event`.
pub async fn run_invocation(
    config: ReplicatorConfig,
    event: Value,
    context: InvocationContext,
) -> ReplicatorResult<InvocationOutcome> {
    let client = HttpBulkClient::new(&config.elasticsearch)?;
    info!(endpoint = client.endpoint(), "bulk client created");

    let pipeline = Pipeline::new(PipelineOptions::new(config.options), client)?;
    let outcome = pipeline.handle(event, context).await?;

    Ok(outcome)
}

/// Reads the stream event from `path`, or from standard input when no path is given.
pub async fn read_event(path: Option<&Path>) -> ReplicatorResult<Value> {
    let raw = match path {
        Some(path) => tokio::fs::read(path).await?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin().read_to_end(&mut buf).await?;
            buf
        }
    };

    serde_json::from_slice(&raw).map_err(ReplicatorError::config)
}

/// Writes the invocation result to standard output as one JSON line.
pub async fn write_outcome(outcome: &InvocationOutcome) -> ReplicatorResult<()> {
    let mut line = serde_json::to_vec(outcome).map_err(ReplicatorError::config)?;
    line.push(b'\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&line).await?;
    stdout.flush().await?;

    Ok(())
}
