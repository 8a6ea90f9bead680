//! Configuration sections shared by the indexer library and the replicator binary.

mod base;
mod elasticsearch;
mod replicator;
mod retry;

pub use base::ValidationError;
pub use elasticsearch::ElasticsearchConfig;
pub use replicator::ReplicatorConfig;
pub use retry::RetryConfig;
