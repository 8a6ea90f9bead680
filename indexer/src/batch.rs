//! Ordered folding of transformed records into one batch.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::IndexerResult;
use crate::options::PipelineConfig;
use crate::transform::transform_record;
use crate::types::{BulkRequest, InvocationContext, RecordMeta, StreamEvent};

/// Action lines and per-record metadata of one invocation, both in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledBatch {
    /// Action lines, each index action followed by its document.
    pub body: Vec<Value>,
    /// One entry per record that produced an action.
    pub metadata: Vec<RecordMeta>,
}

impl AssembledBatch {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Turns the batch into a batch-write request carrying `config`'s extra options.
    pub fn into_request(self, config: &PipelineConfig) -> (BulkRequest, Vec<RecordMeta>) {
        let request = BulkRequest {
            options: config.bulk_options.clone(),
            body: self.body,
        };

        (request, self.metadata)
    }

    fn push(&mut self, meta: RecordMeta) -> IndexerResult<()> {
        self.body.push(meta.action.to_line()?);
        if let Some(document) = &meta.document {
            self.body.push(Value::Object(document.clone()));
        }
        self.metadata.push(meta);

        Ok(())
    }
}

/// Transforms every record of `event` in order and accumulates the results.
///
/// Records are processed one at a time. Any error a record raises, of any kind, is
/// handed to the record-error hook when one is configured and the record is skipped; otherwise,
/// or when the hook itself fails, the error aborts the whole batch.
pub async fn assemble(
    event: &StreamEvent,
    config: &PipelineConfig,
    raw_event: &Arc<Value>,
    context: &Arc<InvocationContext>,
) -> IndexerResult<AssembledBatch> {
    let mut batch = AssembledBatch::default();

    for (position, record) in event.records.iter().enumerate() {
        let result = match transform_record(record, config).await {
            Ok(Some(meta)) => batch.push(meta),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };

        let Err(err) = result else {
            continue;
        };

        let Some(record_error) = &config.hooks.record_error else {
            return Err(err);
        };

        warn!(
            position,
            event_name = %record.event_name,
            error = %err,
            "record skipped after error"
        );
        record_error(raw_event.clone(), context.clone(), err).await?;
    }

    debug!(
        records = event.records.len(),
        actions = batch.metadata.len(),
        "batch assembled"
    );

    Ok(batch)
}
