use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bail;
use crate::error::{ErrorKind, IndexerResult};

/// Kind of mutation described by a change record.
///
/// Unrecognized names are kept verbatim so they can be reported as
/// [`ErrorKind::UnknownEventName`] instead of being silently skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// A new item was written.
    Insert,
    /// An existing item was updated.
    Modify,
    /// An item was deleted.
    Remove,
    /// Any other event name.
    Unknown(String),
}

impl EventName {
    pub fn parse(name: &str) -> Self {
        match name {
            "INSERT" => EventName::Insert,
            "MODIFY" => EventName::Modify,
            "REMOVE" => EventName::Remove,
            other => EventName::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventName::Insert => "INSERT",
            EventName::Modify => "MODIFY",
            EventName::Remove => "REMOVE",
            EventName::Unknown(name) => name,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change description carried by a [`ChangeRecord`].
///
/// Attribute maps are still in their typed, encoded form; see
/// [`crate::conversions::attribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Primary key attributes of the changed item.
    #[serde(rename = "Keys")]
    pub keys: Map<String, Value>,
    /// Item attributes after the change.
    #[serde(rename = "NewImage", default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Map<String, Value>>,
    /// Item attributes before the change.
    #[serde(rename = "OldImage", default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Map<String, Value>>,
    /// Any other attribute of the change description.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of an invocation event, describing a single mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub dynamodb: StreamRecord,
    /// Any other attribute of the record, such as `eventID` or `eventSourceARN`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeRecord {
    pub fn event_name(&self) -> EventName {
        EventName::parse(&self.event_name)
    }

    /// Renders the record back to JSON, e.g. to attach it to an error.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Invocation input: the list of change records to index.
///
/// Only the minimal shape is enforced, unknown fields are tolerated at every level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records")]
    pub records: Vec<ChangeRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamEvent {
    /// Validates the shape of a raw invocation event and decodes it.
    pub fn from_value(event: &Value) -> IndexerResult<StreamEvent> {
        if !event.is_object() {
            bail!(
                ErrorKind::InvalidEventShape,
                "Invocation event has an invalid shape",
                "the event must be an object with a `Records` list"
            );
        }

        match StreamEvent::deserialize(event) {
            Ok(stream_event) => Ok(stream_event),
            Err(err) => bail!(
                ErrorKind::InvalidEventShape,
                "Invocation event has an invalid shape",
                err,
                source: err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_known_and_unknown_event_names() {
        assert_eq!(EventName::parse("INSERT"), EventName::Insert);
        assert_eq!(EventName::parse("MODIFY"), EventName::Modify);
        assert_eq!(EventName::parse("REMOVE"), EventName::Remove);
        assert_eq!(
            EventName::parse("TRUNCATE"),
            EventName::Unknown("TRUNCATE".to_string())
        );
        assert_eq!(EventName::parse("insert").to_string(), "insert");
    }

    #[test]
    fn tolerates_unknown_fields() {
        let event = json!({
            "Records": [{
                "eventID": "1",
                "eventName": "INSERT",
                "dynamodb": {
                    "Keys": {"id": {"S": "k1"}},
                    "SequenceNumber": "111"
                }
            }],
            "source": "test"
        });

        let stream_event = StreamEvent::from_value(&event).unwrap();

        assert_eq!(stream_event.records.len(), 1);
        let record = &stream_event.records[0];
        assert_eq!(record.event_name(), EventName::Insert);
        assert_eq!(record.extra["eventID"], json!("1"));
        assert_eq!(record.dynamodb.extra["SequenceNumber"], json!("111"));
        assert!(record.dynamodb.new_image.is_none());
    }

    #[test]
    fn rejects_missing_records() {
        let err = StreamEvent::from_value(&json!({"records": []})).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidEventShape);
        assert!(err.detail().unwrap().contains("Records"));
    }

    #[test]
    fn rejects_record_without_keys() {
        let event = json!({"Records": [{"eventName": "INSERT", "dynamodb": {}}]});

        let err = StreamEvent::from_value(&event).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidEventShape);
        assert!(err.detail().unwrap().contains("Keys"));
    }

    #[test]
    fn rejects_non_object_event() {
        let err = StreamEvent::from_value(&json!([1, 2])).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidEventShape);
    }

    #[test]
    fn record_renders_back_to_json() {
        let event = json!({"Records": [{"eventName": "X", "dynamodb": {"Keys": {}}}]});
        let stream_event = StreamEvent::from_value(&event).unwrap();

        let rendered: Value = serde_json::from_str(&stream_event.records[0].to_json()).unwrap();

        assert_eq!(rendered, event["Records"][0]);
    }
}
