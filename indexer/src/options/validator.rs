//! Validation of the raw option set.
//!
//! Every rule is checked and every violation is kept, so a single failure reports all of them.

use indexer_config::shared::RetryConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::bail;
use crate::dispatch::RetryPolicy;
use crate::error::{ErrorKind, IndexerResult};
use crate::field::FieldSpec;
use crate::options::{
    DEFAULT_SEPARATOR, IdSource, IndexTarget, PipelineConfig, PipelineOptions, TypeTarget,
    VersionSource,
};

/// Keys accepted in the settings object.
const ALLOWED_KEYS: &[&str] = &[
    "index",
    "index_field",
    "index_prefix",
    "type",
    "type_field",
    "id_field",
    "version_field",
    "parent_field",
    "pick_fields",
    "separator",
    "retry",
    "elasticsearch",
    "bulk",
];

/// Separator between violation clauses in the error detail.
const CLAUSE_SEPARATOR: &str = "; ";

/// First search engine major version without document types.
const TYPELESS_MAJOR_VERSION: u64 = 7;

/// Returns `true` when the client targets a search engine that requires a document type.
///
/// The decision is taken from `api_version` in the client options, e.g. `"6.8"`. Clients
/// without a version are assumed to be typeless.
pub fn requires_document_type(client_options: &Map<String, Value>) -> bool {
    let major = match client_options.get("api_version") {
        Some(Value::String(version)) => version
            .split('.')
            .next()
            .and_then(|major| major.trim().parse::<u64>().ok()),
        Some(Value::Number(version)) => version
            .as_f64()
            .filter(|version| *version >= 0.0)
            .map(|version| version.trunc() as u64),
        _ => None,
    };

    major.is_some_and(|major| major < TYPELESS_MAJOR_VERSION)
}

/// Validates `options` and normalizes them into a [`PipelineConfig`].
///
/// Fails with [`ErrorKind::InvalidConfiguration`] whose detail joins every violated rule.
pub fn validate(options: &PipelineOptions) -> IndexerResult<PipelineConfig> {
    let Some(settings) = options.settings.as_object() else {
        bail!(
            ErrorKind::InvalidConfiguration,
            "Invalid pipeline options",
            format!("options must be an object, got {}", options.settings)
        );
    };

    let mut checker = Checker::new(settings);

    for key in settings.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            checker.violation(format!("\"{key}\" is not allowed"));
        }
    }

    let index = checker.non_empty_string("index");
    let index_field = checker.non_empty_string("index_field");
    let index_prefix = checker.string("index_prefix");
    let doc_type = checker.non_empty_string("type");
    let type_field = checker.non_empty_string("type_field");
    let id_field = checker.field_spec("id_field");
    let version_field = checker.non_empty_string("version_field");
    let parent_field = checker.non_empty_string("parent_field");
    let pick_fields = checker.top_level_names("pick_fields");
    let separator = checker.string("separator");
    let retry = checker.retry("retry");
    let client_options = checker.object("elasticsearch");
    let bulk_options = checker.object("bulk");

    if let Some(bulk_options) = &bulk_options {
        if bulk_options.contains_key("body") {
            checker.violation("\"bulk.body\" is not allowed".to_string());
        }
    }

    // Exclusivity checks look at presence only, so that a malformed value still counts.
    checker.exactly_one("index", "index_field");
    if checker.is_present("index_prefix") {
        if checker.is_present("index") {
            checker
                .violation("\"index_prefix\" conflicts with forbidden peer \"index\"".to_string());
        }
        if !checker.is_present("index_field") {
            checker.violation("\"index_prefix\" missing required peer \"index_field\"".to_string());
        }
    }

    let typed = client_options.as_ref().is_some_and(requires_document_type);
    if typed {
        checker.exactly_one("type", "type_field");
    } else {
        checker.at_most_one("type", "type_field");
    }

    if options.id_resolver.is_some() && checker.is_present("id_field") {
        checker.violation("\"id_field\" conflicts with forbidden peer \"id_resolver\"".to_string());
    }
    if options.version_resolver.is_some() && checker.is_present("version_field") {
        checker.violation(
            "\"version_field\" conflicts with forbidden peer \"version_resolver\"".to_string(),
        );
    }

    if !checker.violations.is_empty() {
        bail!(
            ErrorKind::InvalidConfiguration,
            "Invalid pipeline options",
            detail = checker.violations.join(CLAUSE_SEPARATOR)
        );
    }

    let index = match (index, index_field) {
        (Some(index), _) => IndexTarget::Literal(index),
        (None, Some(field)) => IndexTarget::Field {
            field,
            prefix: index_prefix.unwrap_or_default(),
        },
        (None, None) => bail!(
            ErrorKind::InvalidConfiguration,
            "Invalid pipeline options",
            "one of \"index\" or \"index_field\" is required"
        ),
    };

    let doc_type = match (doc_type, type_field) {
        (Some(doc_type), _) => Some(TypeTarget::Literal(doc_type)),
        (None, Some(field)) => Some(TypeTarget::Field(field)),
        (None, None) => None,
    };

    let id = match (&options.id_resolver, id_field) {
        (Some(resolver), _) => IdSource::Resolver(resolver.clone()),
        (None, Some(spec)) => IdSource::Fields(spec),
        (None, None) => IdSource::Keys,
    };

    let version = match (&options.version_resolver, version_field) {
        (Some(resolver), _) => Some(VersionSource::Resolver(resolver.clone())),
        (None, Some(field)) => Some(VersionSource::Field(field)),
        (None, None) => None,
    };

    let config = PipelineConfig {
        index,
        doc_type,
        id,
        version,
        parent_field,
        pick_fields,
        separator: separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        retry: RetryPolicy::from(&retry.unwrap_or_default()),
        bulk_options: bulk_options.unwrap_or_default(),
        client_options: client_options.unwrap_or_default(),
        hooks: options.hooks.clone(),
    };

    debug!(?config, typed, "pipeline options validated");

    Ok(config)
}

/// Reads typed values out of the settings while recording violations.
struct Checker<'a> {
    settings: &'a Map<String, Value>,
    violations: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(settings: &'a Map<String, Value>) -> Self {
        Self {
            settings,
            violations: Vec::new(),
        }
    }

    fn violation(&mut self, clause: String) {
        self.violations.push(clause);
    }

    /// `null` is treated as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.settings.get(key).filter(|value| !value.is_null())
    }

    fn is_present(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn exactly_one(&mut self, first: &str, second: &str) {
        match (self.is_present(first), self.is_present(second)) {
            (true, true) => self.violation(format!(
                "\"{first}\" conflicts with forbidden peer \"{second}\""
            )),
            (false, false) => self.violation(format!(
                "one of \"{first}\" or \"{second}\" is required"
            )),
            _ => {}
        }
    }

    fn at_most_one(&mut self, first: &str, second: &str) {
        if self.is_present(first) && self.is_present(second) {
            self.violation(format!(
                "\"{first}\" conflicts with forbidden peer \"{second}\""
            ));
        }
    }

    fn string(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.violation(format!("\"{key}\" must be a string"));
                None
            }
        }
    }

    fn non_empty_string(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => {
                self.violation(format!("\"{key}\" must be a non-empty string"));
                None
            }
        }
    }

    fn string_list(&mut self, key: &str) -> Option<Vec<String>> {
        let items = match self.get(key)? {
            Value::Array(items) => items,
            _ => {
                self.violation(format!("\"{key}\" must be an array"));
                return None;
            }
        };

        let mut list = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            match item {
                Value::String(s) if !s.is_empty() => list.push(s.clone()),
                _ => {
                    self.violation(format!(
                        "\"{key}[{position}]\" must be a non-empty string"
                    ));
                    return None;
                }
            }
        }

        Some(list)
    }

    /// A list of top-level document keys; nested paths are rejected.
    fn top_level_names(&mut self, key: &str) -> Option<Vec<String>> {
        let names = self.string_list(key)?;

        for (position, name) in names.iter().enumerate() {
            if name.contains(['.', '[']) {
                self.violation(format!(
                    "\"{key}[{position}]\" must be a top-level field name, got \"{name}\""
                ));
                return None;
            }
        }

        Some(names)
    }

    fn field_spec(&mut self, key: &str) -> Option<FieldSpec> {
        match self.get(key)? {
            Value::String(_) => self.non_empty_string(key).map(FieldSpec::Single),
            Value::Array(items) if items.is_empty() => {
                self.violation(format!("\"{key}\" must contain at least 1 item"));
                None
            }
            Value::Array(_) => self.string_list(key).map(FieldSpec::List),
            _ => {
                self.violation(format!(
                    "\"{key}\" must be a non-empty string or an array of non-empty strings"
                ));
                None
            }
        }
    }

    fn object(&mut self, key: &str) -> Option<Map<String, Value>> {
        match self.get(key)? {
            Value::Object(object) => Some(object.clone()),
            _ => {
                self.violation(format!("\"{key}\" must be an object"));
                None
            }
        }
    }

    /// Accepts either a retry count or a full retry policy object.
    fn retry(&mut self, key: &str) -> Option<RetryConfig> {
        let value = self.get(key)?;

        let config = match value {
            Value::Number(retries) => match retries.as_u64().and_then(|r| u32::try_from(r).ok()) {
                Some(retries) => RetryConfig::with_retries(retries),
                None => {
                    self.violation(format!(
                        "\"{key}\" must be a non-negative integer or an object"
                    ));
                    return None;
                }
            },
            Value::Object(_) => match RetryConfig::deserialize(value) {
                Ok(config) => config,
                Err(err) => {
                    self.violation(format!("\"{key}\" is invalid: {err}"));
                    return None;
                }
            },
            _ => {
                self.violation(format!(
                    "\"{key}\" must be a non-negative integer or an object"
                ));
                return None;
            }
        };

        if let Err(err) = config.validate() {
            self.violation(err.to_string());
            return None;
        }

        Some(config)
    }
}
