//! Function-typed options: lifecycle hooks and identity resolvers.
//!
//! Asynchronous hooks return a boxed future so they can be stored behind an [`Arc`] and shared
//! by concurrent invocations.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{IndexerError, IndexerResult};
use crate::types::{BulkResponse, Document, InvocationContext, ParsedRecord, RecordMeta};

/// Future returned by every asynchronous hook.
pub type HookFuture<T> = BoxFuture<'static, IndexerResult<T>>;

/// Runs before the invocation event is validated.
pub type BeforeHook =
    Arc<dyn Fn(Arc<Value>, Arc<InvocationContext>) -> HookFuture<()> + Send + Sync>;

/// Runs after a successful dispatch; `Some` replaces the invocation result.
pub type AfterHook = Arc<
    dyn Fn(
            Arc<Value>,
            Arc<InvocationContext>,
            BulkResponse,
            Vec<RecordMeta>,
        ) -> HookFuture<Option<Value>>
        + Send
        + Sync,
>;

/// Receives any error raised while transforming a record, which is then swallowed.
pub type RecordErrorHook =
    Arc<dyn Fn(Arc<Value>, Arc<InvocationContext>, IndexerError) -> HookFuture<()> + Send + Sync>;

/// Receives a batch-level error; `Some` recovers with a replacement result.
pub type ErrorHook = Arc<
    dyn Fn(Arc<Value>, Arc<InvocationContext>, IndexerError) -> HookFuture<Option<Value>>
        + Send
        + Sync,
>;

/// Reshapes the document of a record; `None` drops the record from the batch.
pub type TransformRecordHook =
    Arc<dyn Fn(Document, Arc<ParsedRecord>) -> HookFuture<Option<Document>> + Send + Sync>;

/// Computes a document id from the candidate document and the old image.
pub type IdResolver =
    Arc<dyn Fn(&Document, Option<&Document>) -> IndexerResult<String> + Send + Sync>;

/// Computes a document version from the candidate document and the old image.
pub type VersionResolver =
    Arc<dyn Fn(&Document, Option<&Document>) -> IndexerResult<Value> + Send + Sync>;

/// The optional lifecycle hooks of a pipeline.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before: Option<BeforeHook>,
    pub after: Option<AfterHook>,
    pub record_error: Option<RecordErrorHook>,
    pub error: Option<ErrorHook>,
    pub transform_record: Option<TransformRecordHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("record_error", &self.record_error.is_some())
            .field("error", &self.error.is_some())
            .field("transform_record", &self.transform_record.is_some())
            .finish()
    }
}
