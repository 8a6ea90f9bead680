use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::info;

use crate::client::BulkClient;
use crate::error::{IndexerError, IndexerResult};
use crate::types::{BulkRequest, BulkResponse};

#[derive(Debug, Default)]
struct Inner {
    requests: Vec<BulkRequest>,
    calls: usize,
    scripted_failures: VecDeque<IndexerError>,
    permanent_failure: Option<IndexerError>,
}

/// In-memory client for testing and development purposes.
///
/// [`MemoryBulkClient`] records every request it receives and answers with a synthesized
/// response acknowledging each action. Failures can be injected to exercise retries and
/// error hooks. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBulkClient {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBulkClient {
    /// Creates a client with no recorded request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call fail with `err`; scripted failures are consumed in order.
    pub async fn fail_next(&self, err: IndexerError) {
        let mut inner = self.inner.lock().await;
        inner.scripted_failures.push_back(err);
    }

    /// Makes every call fail with `err` once scripted failures are exhausted.
    pub async fn fail_always(&self, err: IndexerError) {
        let mut inner = self.inner.lock().await;
        inner.permanent_failure = Some(err);
    }

    /// Returns the number of calls received, failed ones included.
    pub async fn calls(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.calls
    }

    /// Returns a copy of every request received, failed ones included.
    pub async fn requests(&self) -> Vec<BulkRequest> {
        let inner = self.inner.lock().await;
        inner.requests.clone()
    }

    /// Clears recorded requests and injected failures.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        *inner = Inner::default();
    }
}

impl BulkClient for MemoryBulkClient {
    fn name() -> &'static str {
        "memory"
    }

    async fn bulk(&self, request: BulkRequest) -> IndexerResult<BulkResponse> {
        let mut inner = self.inner.lock().await;

        inner.calls += 1;
        info!(
            call = inner.calls,
            actions = request.action_count(),
            "received bulk request"
        );

        let response = synthesize_response(&request);
        inner.requests.push(request);

        if let Some(err) = inner.scripted_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = &inner.permanent_failure {
            return Err(err.clone());
        }

        Ok(response)
    }
}

/// Builds a response acknowledging every action line of `request`.
fn synthesize_response(request: &BulkRequest) -> BulkResponse {
    let items = request
        .actions()
        .into_iter()
        .map(|(op, descriptor)| {
            let (status, result) = match op {
                "delete" => (200, "deleted"),
                _ => (201, "created"),
            };

            json!({
                op: {
                    "_index": descriptor.get("_index").cloned().unwrap_or(Value::Null),
                    "_id": descriptor.get("_id").cloned().unwrap_or(Value::Null),
                    "status": status,
                    "result": result
                }
            })
        })
        .collect();

    BulkResponse {
        took: 1,
        errors: false,
        items,
        extra: Default::default(),
    }
}
