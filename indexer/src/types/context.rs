use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context of one invocation, supplied by the runtime that delivers the change records.
///
/// The pipeline never interprets the context: it is handed to the lifecycle hooks untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Identifier of the invocation, used to correlate log lines.
    #[serde(default)]
    pub request_id: String,
    /// Name of the function or process handling the invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Runtime specific attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InvocationContext {
    /// Creates a context carrying only a request id.
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}
