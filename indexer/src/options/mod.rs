//! Pipeline options: the raw option set, its validation and the normalized result.
//!
//! A pipeline is configured with a JSON object of settings plus the function-typed options
//! that can only be attached in code. [`validate`] checks the whole set once, at pipeline
//! construction, and produces an immutable [`PipelineConfig`].

mod config;
mod hooks;
mod validator;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

pub use config::*;
pub use hooks::*;
pub use validator::{requires_document_type, validate};

use crate::error::{IndexerError, IndexerResult};
use crate::types::{BulkResponse, Document, InvocationContext, ParsedRecord, RecordMeta};

/// Raw, unvalidated option set of a pipeline.
#[derive(Clone)]
pub struct PipelineOptions {
    /// JSON settings, e.g. `{"index": "items", "type": "item", "retry": 2}`.
    pub settings: Value,
    pub id_resolver: Option<IdResolver>,
    pub version_resolver: Option<VersionResolver>,
    pub hooks: Hooks,
}

impl PipelineOptions {
    pub fn new(settings: Value) -> Self {
        Self {
            settings,
            id_resolver: None,
            version_resolver: None,
            hooks: Hooks::default(),
        }
    }

    pub fn with_id_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Document, Option<&Document>) -> IndexerResult<String> + Send + Sync + 'static,
    {
        self.id_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_version_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Document, Option<&Document>) -> IndexerResult<Value> + Send + Sync + 'static,
    {
        self.version_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn before<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Value>, Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IndexerResult<()>> + Send + 'static,
    {
        let hook: BeforeHook = Arc::new(move |event: Arc<Value>, context: Arc<InvocationContext>| {
            hook(event, context).boxed()
        });
        self.hooks.before = Some(hook);
        self
    }

    pub fn after<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Value>, Arc<InvocationContext>, BulkResponse, Vec<RecordMeta>) -> Fut
            + Send
            + Sync
            + 'static,
        Fut: Future<Output = IndexerResult<Option<Value>>> + Send + 'static,
    {
        let hook: AfterHook = Arc::new(
            move |event: Arc<Value>,
                  context: Arc<InvocationContext>,
                  response: BulkResponse,
                  metadata: Vec<RecordMeta>| {
                hook(event, context, response, metadata).boxed()
            },
        );
        self.hooks.after = Some(hook);
        self
    }

    pub fn record_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Value>, Arc<InvocationContext>, IndexerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IndexerResult<()>> + Send + 'static,
    {
        let hook: RecordErrorHook = Arc::new(
            move |event: Arc<Value>, context: Arc<InvocationContext>, err: IndexerError| {
                hook(event, context, err).boxed()
            },
        );
        self.hooks.record_error = Some(hook);
        self
    }

    pub fn error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Value>, Arc<InvocationContext>, IndexerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IndexerResult<Option<Value>>> + Send + 'static,
    {
        let hook: ErrorHook = Arc::new(
            move |event: Arc<Value>, context: Arc<InvocationContext>, err: IndexerError| {
                hook(event, context, err).boxed()
            },
        );
        self.hooks.error = Some(hook);
        self
    }

    pub fn transform_record<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Document, Arc<ParsedRecord>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IndexerResult<Option<Document>>> + Send + 'static,
    {
        let hook: TransformRecordHook =
            Arc::new(move |document: Document, parsed: Arc<ParsedRecord>| {
                hook(document, parsed).boxed()
            });
        self.hooks.transform_record = Some(hook);
        self
    }
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("settings", &self.settings)
            .field("id_resolver", &self.id_resolver.is_some())
            .field("version_resolver", &self.version_resolver.is_some())
            .field("hooks", &self.hooks)
            .finish()
    }
}
