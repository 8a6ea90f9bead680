//! Command line runner for the indexer pipeline.
//!
//! Loads the configuration, reads one stream event from a file or standard input, runs it
//! through the pipeline against the configured cluster and prints the result.

use std::path::PathBuf;

use clap::Parser;
use indexer::types::InvocationContext;
use indexer_config::shared::ReplicatorConfig;
use indexer_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_replicator_config;
use crate::core::{read_event, run_invocation, write_outcome};
use crate::error::{ReplicatorError, ReplicatorResult};

mod config;
mod core;
mod error;

/// Request id used when none is passed on the command line.
const DEFAULT_REQUEST_ID: &str = "local";

#[derive(Debug, Parser)]
#[command(name = "indexer-replicator", version, about)]
struct Args {
    /// Path of the stream event JSON file, standard input when omitted.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Request id attached to the invocation context.
    #[arg(long, default_value = DEFAULT_REQUEST_ID)]
    request_id: String,

    /// Function name attached to the invocation context.
    #[arg(long)]
    function_name: Option<String>,
}

fn main() -> ReplicatorResult<()> {
    let args = Args::parse();

    let replicator_config = load_replicator_config()?;

    init_tracing(env!("CARGO_BIN_NAME")).map_err(ReplicatorError::config)?;

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args, replicator_config));

    if let Err(err) = &result {
        eprint!("{}", err.render_report());
    }

    result
}

async fn async_main(args: Args, replicator_config: ReplicatorConfig) -> ReplicatorResult<()> {
    let context = InvocationContext {
        request_id: args.request_id,
        function_name: args.function_name,
        ..InvocationContext::default()
    };

    let event = read_event(args.event.as_deref()).await?;

    match run_invocation(replicator_config, event, context).await {
        Ok(outcome) => write_outcome(&outcome).await,
        Err(err) => {
            error!("{err}");
            Err(err)
        }
    }
}
