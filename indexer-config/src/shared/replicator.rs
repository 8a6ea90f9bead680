use serde::Deserialize;

use crate::Config;
use crate::shared::{ElasticsearchConfig, ValidationError};

/// Complete configuration for the replicator binary.
///
/// `options` is kept as raw JSON: it is the pipeline option object, validated by the indexer
/// library when the pipeline is constructed so that every violated rule is reported at once.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicatorConfig {
    /// Connection settings of the bulk endpoint.
    pub elasticsearch: ElasticsearchConfig,
    /// Raw pipeline options.
    #[serde(default = "default_options")]
    pub options: serde_json::Value,
}

fn default_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl ReplicatorConfig {
    /// Validates the sections owned by this crate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.elasticsearch.validate()
    }
}

impl Config for ReplicatorConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["options.pick_fields", "options.id_field"];
}
