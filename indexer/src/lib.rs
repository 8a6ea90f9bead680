//! Change-record to bulk-request indexing pipeline.
//!
//! Converts batches of database change records into a single batch-write request for a search
//! engine. Each record is decoded, its identity (index, type, id, parent and external version)
//! is resolved from configurable fields or resolver functions, and it becomes an index or a
//! delete action. The assembled batch is dispatched with bounded retry, and optional lifecycle
//! hooks can observe or replace the result of every invocation.
//!
//! # Example
//!
//! ```rust,no_run
//! use indexer::client::memory::MemoryBulkClient;
//! use indexer::options::PipelineOptions;
//! use indexer::pipeline::Pipeline;
//! use indexer::types::InvocationContext;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = PipelineOptions::new(json!({"index": "items", "version_field": "version"}));
//! let pipeline = Pipeline::new(options, MemoryBulkClient::new())?;
//!
//! let event = json!({"Records": [{
//!     "eventName": "INSERT",
//!     "dynamodb": {
//!         "Keys": {"id": {"S": "k1"}},
//!         "NewImage": {"id": {"S": "k1"}, "version": {"N": "1"}}
//!     }
//! }]});
//!
//! let outcome = pipeline
//!     .handle(event, InvocationContext::with_request_id("req-1"))
//!     .await?;
//! println!("{}", serde_json::to_string(&outcome)?);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod conversions;
pub mod dispatch;
pub mod error;
pub mod field;
mod macros;
pub mod options;
pub mod pipeline;
pub mod transform;
pub mod types;
