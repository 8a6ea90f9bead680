use std::future::Future;

use crate::error::IndexerResult;
use crate::types::{BulkRequest, BulkResponse};

/// Trait for clients able to execute one batch-write call against a search engine.
///
/// A client is shared by every invocation of a pipeline and is only ever called, never
/// mutated through the pipeline. Implementations must tolerate concurrent calls.
///
/// A call either returns the engine's response, whose `errors` flag may report item level
/// failures, or fails as a whole. Failed calls may be repeated with the exact same request.
pub trait BulkClient {
    /// Returns the name of the client.
    fn name() -> &'static str;

    /// Executes one batch-write call.
    fn bulk(
        &self,
        request: BulkRequest,
    ) -> impl Future<Output = IndexerResult<BulkResponse>> + Send;
}
