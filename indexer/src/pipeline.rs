//! Invocation orchestration.
//!
//! A [`Pipeline`] validates its options once and then handles any number of invocations,
//! possibly concurrently. Each invocation runs through these steps, each awaited before the
//! next one starts:
//!
//! 1. before hook
//! 2. event shape validation
//! 3. ordered record transformation into a batch
//! 4. retry-governed dispatch, replaced by an empty result for an empty batch
//! 5. after hook, which may replace the result
//!
//! Any failure along the way is offered to the error hook, which may recover with a
//! replacement result.

use std::sync::Arc;

use serde_json::Value;
use tracing::{Instrument, error, info, info_span};

use crate::batch::assemble;
use crate::client::BulkClient;
use crate::dispatch::dispatch;
use crate::error::{IndexerError, IndexerResult};
use crate::options::{PipelineConfig, PipelineOptions, validate};
use crate::types::{BulkResponse, InvocationContext, InvocationOutcome, StreamEvent};

/// Change-record to bulk-request pipeline bound to one client.
#[derive(Debug)]
pub struct Pipeline<C> {
    config: Arc<PipelineConfig>,
    client: Arc<C>,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
        }
    }
}

impl<C> Pipeline<C>
where
    C: BulkClient + Send + Sync,
{
    /// Validates `options` and creates a pipeline dispatching through `client`.
    ///
    /// Fails with [`crate::error::ErrorKind::InvalidConfiguration`] listing every violated rule.
    pub fn new(options: PipelineOptions, client: C) -> IndexerResult<Self> {
        Self::with_shared_client(options, Arc::new(client))
    }

    /// Same as [`Pipeline::new`] for a client shared with other owners.
    pub fn with_shared_client(options: PipelineOptions, client: Arc<C>) -> IndexerResult<Self> {
        let config = validate(&options)?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Handles one invocation.
    pub async fn handle(
        &self,
        event: Value,
        context: InvocationContext,
    ) -> IndexerResult<InvocationOutcome> {
        let span = info_span!("invocation", request_id = %context.request_id);
        let event = Arc::new(event);
        let context = Arc::new(context);

        async {
            match self.run(&event, &context).await {
                Ok(outcome) => Ok(outcome),
                Err(err) => self.recover(&event, &context, err).await,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        event: &Arc<Value>,
        context: &Arc<InvocationContext>,
    ) -> IndexerResult<InvocationOutcome> {
        let hooks = &self.config.hooks;

        if let Some(before) = &hooks.before {
            before(event.clone(), context.clone()).await?;
        }

        let stream_event = StreamEvent::from_value(event)?;
        let batch = assemble(&stream_event, &self.config, event, context).await?;

        let (response, metadata) = if batch.is_empty() {
            info!(
                records = stream_event.records.len(),
                "no action to dispatch, skipping bulk request"
            );

            (BulkResponse::empty(), batch.metadata)
        } else {
            let (request, metadata) = batch.into_request(&self.config);
            let response = dispatch(self.client.as_ref(), request, &self.config.retry).await?;

            (response, metadata)
        };

        if let Some(after) = &hooks.after {
            let replacement = after(event.clone(), context.clone(), response.clone(), metadata);
            if let Some(replacement) = replacement.await? {
                return Ok(InvocationOutcome::Replaced(replacement));
            }
        }

        Ok(InvocationOutcome::Bulk(response))
    }

    /// Offers a failed invocation to the error hook.
    ///
    /// The original error is returned when no hook is configured or the hook returns `None`.
    async fn recover(
        &self,
        event: &Arc<Value>,
        context: &Arc<InvocationContext>,
        err: IndexerError,
    ) -> IndexerResult<InvocationOutcome> {
        error!(kind = ?err.kind(), error = %err, "invocation failed");

        let Some(error_hook) = &self.config.hooks.error else {
            return Err(err);
        };

        match error_hook(event.clone(), context.clone(), err.clone()).await? {
            Some(replacement) => {
                info!("invocation recovered by error hook");
                Ok(InvocationOutcome::Replaced(replacement))
            }
            None => Err(err),
        }
    }
}
