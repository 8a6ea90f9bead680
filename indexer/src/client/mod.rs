//! Batch-write clients.
//!
//! The pipeline talks to the search engine through the [`BulkClient`] trait. An HTTP
//! implementation targets a real cluster, an in-memory one serves tests and local runs.

mod base;
pub mod http;
pub mod memory;

pub use base::BulkClient;
