use std::fmt;

use serde_json::{Map, Value};

use crate::dispatch::RetryPolicy;
use crate::field::FieldSpec;
use crate::options::{Hooks, IdResolver, VersionResolver};

/// Default separator joining the parts of a composite id.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Where the index name of an action comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    Literal(String),
    /// The resolved field value, prefixed with `prefix`.
    Field { field: String, prefix: String },
}

/// Where the document type of an action comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTarget {
    Literal(String),
    Field(String),
}

/// Where the document id of an action comes from.
#[derive(Clone)]
pub enum IdSource {
    Resolver(IdResolver),
    Fields(FieldSpec),
    /// Every key attribute of the record, in ascending name order.
    Keys,
}

impl fmt::Debug for IdSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdSource::Resolver(_) => f.write_str("Resolver(..)"),
            IdSource::Fields(spec) => f.debug_tuple("Fields").field(spec).finish(),
            IdSource::Keys => f.write_str("Keys"),
        }
    }
}

/// Where the external version of an action comes from.
#[derive(Clone)]
pub enum VersionSource {
    Resolver(VersionResolver),
    Field(String),
}

impl fmt::Debug for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Resolver(_) => f.write_str("Resolver(..)"),
            VersionSource::Field(field) => f.debug_tuple("Field").field(field).finish(),
        }
    }
}

/// Validated, normalized options of a pipeline.
///
/// Produced once by [`crate::options::validate`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub index: IndexTarget,
    /// `None` omits the type from every action.
    pub doc_type: Option<TypeTarget>,
    pub id: IdSource,
    /// `None` produces unversioned actions.
    pub version: Option<VersionSource>,
    pub parent_field: Option<String>,
    /// Top-level fields kept in the indexed document, all of them when `None`.
    pub pick_fields: Option<Vec<String>>,
    /// Separator of composite ids, possibly empty.
    pub separator: String,
    pub retry: RetryPolicy,
    /// Extra options sent with every batch-write call.
    pub bulk_options: Map<String, Value>,
    /// Options describing the search engine client.
    pub client_options: Map<String, Value>,
    pub hooks: Hooks,
}
