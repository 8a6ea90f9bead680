use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

use crate::bail;
use crate::error::{ErrorKind, IndexerResult};
use crate::types::{ChangeRecord, Document, ParsedRecord};

/// Versioning scheme attached to a versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    /// The caller owns the version; stale versions are rejected by the search engine.
    External,
}

/// A validated, non-negative external version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalVersion {
    pub version: Number,
    pub version_type: VersionType,
}

impl ExternalVersion {
    /// Validates that `value` is a number greater than or equal to zero.
    ///
    /// `label` names the origin of the value in the error detail.
    pub fn parse(value: &Value, label: &str) -> IndexerResult<ExternalVersion> {
        let number = match value {
            Value::Number(number) if number.as_f64().is_some_and(|v| v >= 0.0) => number.clone(),
            other => bail!(
                ErrorKind::InvalidVersion,
                "Version is not a non-negative number",
                format!("`{label}` must be a number greater than or equal to 0, got {other}")
            ),
        };

        Ok(ExternalVersion {
            version: number,
            version_type: VersionType::External,
        })
    }

    /// Returns the version a delete must carry to supersede this one.
    pub fn next(&self) -> IndexerResult<ExternalVersion> {
        let next = if let Some(version) = self.version.as_u64() {
            version.checked_add(1).map(Number::from)
        } else {
            self.version
                .as_f64()
                .and_then(|version| Number::from_f64(version + 1.0))
        };

        let Some(version) = next else {
            bail!(
                ErrorKind::InvalidVersion,
                "Version cannot be incremented",
                format!("version {} has no successor", self.version)
            );
        };

        Ok(ExternalVersion {
            version,
            version_type: self.version_type,
        })
    }
}

/// Target identity of one write: where the document goes and under which version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    #[serde(rename = "_index")]
    pub index: String,
    /// Omitted entirely when no type resolves to a non-blank value.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub version: Option<ExternalVersion>,
}

/// Operation of a bulk action line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkOp {
    Index,
    Delete,
}

impl BulkOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkOp::Index => "index",
            BulkOp::Delete => "delete",
        }
    }
}

impl fmt::Display for BulkOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action line of the batch: an operation tagging a descriptor.
///
/// Index actions are followed by their document in the request body, delete actions stand alone.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAction {
    pub op: BulkOp,
    pub descriptor: ActionDescriptor,
}

impl BulkAction {
    pub fn index(descriptor: ActionDescriptor) -> Self {
        Self {
            op: BulkOp::Index,
            descriptor,
        }
    }

    pub fn delete(descriptor: ActionDescriptor) -> Self {
        Self {
            op: BulkOp::Delete,
            descriptor,
        }
    }

    /// Renders the action line, e.g. `{"index": {"_index": "i", "_id": "k1"}}`.
    pub fn to_line(&self) -> IndexerResult<Value> {
        let descriptor = serde_json::to_value(&self.descriptor)?;
        Ok(json!({ self.op.as_str(): descriptor }))
    }
}

/// What the pipeline remembers about one record that produced an action.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    /// The record as delivered in the invocation event.
    pub record: ChangeRecord,
    /// The decoded maps of the record.
    pub parsed: Arc<ParsedRecord>,
    /// The action queued for the record.
    pub action: BulkAction,
    /// The document queued after the action, absent for deletes.
    pub document: Option<Document>,
}

/// Structured argument of a batch-write call: extra options plus the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRequest {
    /// Extra options such as `refresh` or `timeout`, forwarded as given.
    #[serde(flatten)]
    pub options: Map<String, Value>,
    /// Action lines, each index action followed by its document.
    pub body: Vec<Value>,
}

impl BulkRequest {
    /// Returns the action lines of the body with their operation name.
    ///
    /// The body is walked in order and the line following an index action is taken as its
    /// document, so a document shaped like an action line is never mistaken for one.
    pub fn actions(&self) -> Vec<(&str, &Value)> {
        let mut actions = Vec::new();
        let mut lines = self.body.iter();

        while let Some(line) = lines.next() {
            let Some((op, descriptor)) = line
                .as_object()
                .filter(|object| object.len() == 1)
                .and_then(|object| object.iter().next())
            else {
                continue;
            };

            match op.as_str() {
                "index" => {
                    lines.next();
                    actions.push((BulkOp::Index.as_str(), descriptor));
                }
                "delete" => actions.push((BulkOp::Delete.as_str(), descriptor)),
                _ => {}
            }
        }

        actions
    }

    /// Returns the number of actions in the body.
    pub fn action_count(&self) -> usize {
        self.actions().len()
    }
}

/// Result of a batch-write call.
///
/// `errors` is surfaced as returned; item level failures are left for the caller to interpret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub took: u64,
    pub errors: bool,
    pub items: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BulkResponse {
    /// The canonical result of an invocation that queued no action.
    pub fn empty() -> Self {
        Self {
            took: 0,
            errors: false,
            items: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Successful result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvocationOutcome {
    /// The batch-write result, or the empty result when nothing was queued.
    Bulk(BulkResponse),
    /// A value returned by the after hook or the error hook.
    Replaced(Value),
}

impl InvocationOutcome {
    /// Returns the batch-write result unless a hook replaced it.
    pub fn as_bulk(&self) -> Option<&BulkResponse> {
        match self {
            InvocationOutcome::Bulk(response) => Some(response),
            InvocationOutcome::Replaced(_) => None,
        }
    }
}
