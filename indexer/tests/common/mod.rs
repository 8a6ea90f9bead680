#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexer::client::memory::MemoryBulkClient;
use indexer::options::PipelineOptions;
use indexer::pipeline::Pipeline;
use serde_json::{Map, Value, json};

/// Encodes a plain JSON object as a map of typed attribute values.
pub fn attributes(value: Value) -> Value {
    let Value::Object(object) = value else {
        panic!("attributes must be built from an object");
    };

    Value::Object(
        object
            .into_iter()
            .map(|(name, value)| (name, attribute(value)))
            .collect::<Map<_, _>>(),
    )
}

/// Encodes one plain JSON value as a typed attribute value.
pub fn attribute(value: Value) -> Value {
    match value {
        Value::Null => json!({"NULL": true}),
        Value::Bool(b) => json!({"BOOL": b}),
        Value::Number(n) => json!({"N": n.to_string()}),
        Value::String(s) => json!({"S": s}),
        Value::Array(items) => json!({"L": items.into_iter().map(attribute).collect::<Vec<_>>()}),
        object @ Value::Object(_) => json!({"M": attributes(object)}),
    }
}

/// Builds a change record from plain JSON images.
pub fn change_record(
    event_name: &str,
    keys: Value,
    new_image: Option<Value>,
    old_image: Option<Value>,
) -> Value {
    let mut dynamodb = json!({"Keys": attributes(keys), "SequenceNumber": "1"});
    if let Some(new_image) = new_image {
        dynamodb["NewImage"] = attributes(new_image);
    }
    if let Some(old_image) = old_image {
        dynamodb["OldImage"] = attributes(old_image);
    }

    json!({
        "eventID": "0",
        "eventName": event_name,
        "eventSource": "aws:dynamodb",
        "dynamodb": dynamodb
    })
}

pub fn insert_record(keys: Value, new_image: Value) -> Value {
    change_record("INSERT", keys, Some(new_image), None)
}

pub fn modify_record(keys: Value, new_image: Value, old_image: Value) -> Value {
    change_record("MODIFY", keys, Some(new_image), Some(old_image))
}

pub fn remove_record(keys: Value, old_image: Value) -> Value {
    change_record("REMOVE", keys, None, Some(old_image))
}

/// Wraps records into an invocation event.
pub fn stream_event(records: Vec<Value>) -> Value {
    json!({"Records": records})
}

/// Creates a pipeline over a fresh in-memory client and returns both.
pub fn create_pipeline(options: PipelineOptions) -> (Pipeline<MemoryBulkClient>, MemoryBulkClient) {
    let client = MemoryBulkClient::new();
    let pipeline = Pipeline::new(options, client.clone()).expect("valid pipeline options");

    (pipeline, client)
}

/// Retry settings without any delay between attempts.
pub fn immediate_retry(retries: u32) -> Value {
    json!({"retries": retries, "min_timeout_ms": 0, "max_timeout_ms": 0})
}

/// Shared counter observable from hooks.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
