use std::sync::{Arc, Mutex};

use indexer::client::memory::MemoryBulkClient;
use indexer::error::{ErrorKind, IndexerError};
use indexer::indexer_error;
use indexer::options::PipelineOptions;
use indexer::pipeline::Pipeline;
use indexer::types::{
    BulkResponse, Document, InvocationContext, InvocationOutcome, ParsedRecord, RecordMeta,
};
use indexer_telemetry::tracing::init_test_tracing;
use serde_json::{Value, json};

use crate::common::{
    Counter, create_pipeline, immediate_retry, insert_record, modify_record, remove_record,
    stream_event,
};

mod common;

fn context() -> InvocationContext {
    InvocationContext::with_request_id("req-1")
}

fn bulk(outcome: &InvocationOutcome) -> &BulkResponse {
    outcome.as_bulk().expect("bulk response")
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_produces_action_and_document() {
    init_test_tracing();

    let (pipeline, client) =
        create_pipeline(PipelineOptions::new(json!({"index": "i", "type": "t"})));
    let event = stream_event(vec![insert_record(
        json!({"id": "k1"}),
        json!({"id": "k1", "v": 5}),
    )]);

    let outcome = pipeline.handle(event, context()).await.unwrap();

    assert!(!bulk(&outcome).errors);
    let requests = client.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].body,
        vec![
            json!({"index": {"_index": "i", "_type": "t", "_id": "k1"}}),
            json!({"id": "k1", "v": 5}),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_carries_incremented_external_version() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(
        json!({"index": "i", "type": "t", "version_field": "v"}),
    ));
    let event = stream_event(vec![remove_record(
        json!({"id": "k1"}),
        json!({"id": "k1", "v": 3}),
    )]);

    pipeline.handle(event, context()).await.unwrap();

    let requests = client.requests().await;
    assert_eq!(
        requests[0].body,
        vec![json!({"delete": {
            "_index": "i",
            "_type": "t",
            "_id": "k1",
            "version": 4,
            "version_type": "external"
        }})]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn version_zero_is_forwarded_verbatim() {
    init_test_tracing();

    let (pipeline, client) =
        create_pipeline(PipelineOptions::new(json!({"index": "i", "version_field": "v"})));
    let event = stream_event(vec![insert_record(
        json!({"id": "k1"}),
        json!({"id": "k1", "v": 0}),
    )]);

    pipeline.handle(event, context()).await.unwrap();

    let requests = client.requests().await;
    assert_eq!(
        requests[0].body[0],
        json!({"index": {"_index": "i", "_id": "k1", "version": 0, "version_type": "external"}})
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn field_only_in_old_image_is_resolved() {
    init_test_tracing();

    let (pipeline, client) =
        create_pipeline(PipelineOptions::new(json!({"index": "i", "parent_field": "owner"})));
    let event = stream_event(vec![
        modify_record(json!({"id": "k1"}), json!({"id": "k1"}), json!({"owner": "p1"})),
        remove_record(json!({"id": "k2"}), json!({"owner": "p2"})),
    ]);

    pipeline.handle(event, context()).await.unwrap();

    let requests = client.requests().await;
    let body = &requests[0].body;
    assert_eq!(body[0]["index"]["parent"], json!("p1"));
    assert_eq!(body[2]["delete"]["parent"], json!("p2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_options_report_every_violation() {
    init_test_tracing();

    let options = PipelineOptions::new(json!({"index_prefix": "p-", "index": "i", "type": 1}));

    let err = Pipeline::new(options, MemoryBulkClient::new()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    assert_eq!(
        err.detail(),
        Some(
            "\"type\" must be a non-empty string; \
             \"index_prefix\" conflicts with forbidden peer \"index\"; \
             \"index_prefix\" missing required peer \"index_field\""
        )
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_event_aborts_without_record_error_hook() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(json!({"index": "i"})));
    let unknown = common::change_record("TRUNCATE", json!({"id": "k2"}), None, None);
    let event = stream_event(vec![
        insert_record(json!({"id": "k1"}), json!({"id": "k1"})),
        unknown.clone(),
    ]);

    let err = pipeline.handle(event, context()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownEventName);
    let detail: &str = err.detail().unwrap();
    let raw = &detail[detail.find("record: ").unwrap() + "record: ".len()..];
    assert_eq!(serde_json::from_str::<Value>(raw).unwrap(), unknown);
    assert_eq!(client.calls().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn record_error_hook_excludes_failed_records() {
    init_test_tracing();

    let errors = Arc::new(Mutex::new(Vec::<ErrorKind>::new()));
    let hook_errors = errors.clone();
    let options = PipelineOptions::new(json!({"index": "i", "version_field": "v"})).record_error(
        move |_event: Arc<Value>, _context: Arc<InvocationContext>, err: IndexerError| {
            let errors = hook_errors.clone();
            async move {
                errors.lock().unwrap().push(err.kind());
                Ok(())
            }
        },
    );
    let (pipeline, client) = create_pipeline(options);
    let event = stream_event(vec![
        common::change_record("TRUNCATE", json!({"id": "k0"}), None, Some(json!({"v": 1}))),
        insert_record(json!({"id": "k1"}), json!({"id": "k1", "v": 1})),
        insert_record(json!({"id": "k2"}), json!({"id": "k2", "v": -1})),
        insert_record(json!({"id": "k3"}), json!({"id": "k3"})),
    ]);

    pipeline.handle(event, context()).await.unwrap();

    assert_eq!(
        *errors.lock().unwrap(),
        vec![
            ErrorKind::UnknownEventName,
            ErrorKind::InvalidVersion,
            ErrorKind::FieldNotFound
        ]
    );
    let requests = client.requests().await;
    let body = &requests[0].body;
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["index"]["_id"], json!("k1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn zero_retries_call_the_client_once() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(json!({"index": "i"})));
    let event = stream_event(vec![insert_record(json!({"id": "k1"}), json!({"id": "k1"}))]);

    pipeline.handle(event.clone(), context()).await.unwrap();
    assert_eq!(client.calls().await, 1);

    client.clear().await;
    let err = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "down");
    client.fail_always(err.clone()).await;

    let result = pipeline.handle(event, context()).await;

    assert_eq!(result.unwrap_err(), err);
    assert_eq!(client.calls().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_surface_the_client_error() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(
        json!({"index": "i", "retry": immediate_retry(3)}),
    ));
    let err = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "down");
    client.fail_always(err.clone()).await;
    let event = stream_event(vec![insert_record(json!({"id": "k1"}), json!({"id": "k1"}))]);

    let result = pipeline.handle(event, context()).await.unwrap_err();

    assert_eq!(result, err);
    assert_eq!(result.location(), err.location());
    assert_eq!(client.calls().await, 4);
    let requests = client.requests().await;
    assert!(requests.iter().all(|request| request == &requests[0]));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_skips_dispatch_but_runs_after_hook() {
    init_test_tracing();

    let after_calls = Counter::default();
    let hook_calls = after_calls.clone();
    let options = PipelineOptions::new(json!({"index": "i"}))
        .transform_record(|_document: Document, _parsed: Arc<ParsedRecord>| async { Ok(None) })
        .after(
            move |_event: Arc<Value>,
                  _context: Arc<InvocationContext>,
                  response: BulkResponse,
                  metadata: Vec<RecordMeta>| {
                hook_calls.increment();
                async move {
                    assert_eq!(response, BulkResponse::empty());
                    assert!(metadata.is_empty());
                    Ok(None)
                }
            },
        );
    let (pipeline, client) = create_pipeline(options);
    let event = stream_event(vec![
        insert_record(json!({"id": "k1"}), json!({"id": "k1"})),
        remove_record(json!({"id": "k2"}), json!({"id": "k2"})),
    ]);

    let outcome = pipeline.handle(event, context()).await.unwrap();

    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"took": 0, "errors": false, "items": []})
    );
    assert_eq!(client.calls().await, 0);
    assert_eq!(after_calls.get(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn after_hook_may_replace_empty_result() {
    init_test_tracing();

    let options = PipelineOptions::new(json!({"index": "i"}))
        .transform_record(|_document: Document, _parsed: Arc<ParsedRecord>| async { Ok(None) })
        .after(
            |_event: Arc<Value>,
             _context: Arc<InvocationContext>,
             _response: BulkResponse,
             _metadata: Vec<RecordMeta>| async { Ok(Some(json!({"replaced": true}))) },
        );
    let (pipeline, client) = create_pipeline(options);
    let event = stream_event(vec![insert_record(json!({"id": "k1"}), json!({"id": "k1"}))]);

    let outcome = pipeline.handle(event, context()).await.unwrap();

    assert_eq!(outcome, InvocationOutcome::Replaced(json!({"replaced": true})));
    assert_eq!(client.calls().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn after_hook_sees_metadata_and_may_replace_result() {
    init_test_tracing();

    let options = PipelineOptions::new(json!({"index": "i"})).after(
        |_event: Arc<Value>,
         context: Arc<InvocationContext>,
         response: BulkResponse,
         metadata: Vec<RecordMeta>| async move {
            let ids = metadata
                .iter()
                .map(|meta| meta.action.descriptor.id.clone())
                .collect::<Vec<_>>();
            let documents = metadata
                .iter()
                .map(|meta| meta.document.is_some())
                .collect::<Vec<_>>();

            Ok(Some(json!({
                "request_id": context.request_id,
                "items": response.items.len(),
                "ids": ids,
                "documents": documents
            })))
        },
    );
    let (pipeline, _client) = create_pipeline(options);
    let event = stream_event(vec![
        insert_record(json!({"id": "k1"}), json!({"id": "k1"})),
        remove_record(json!({"id": "k2"}), json!({"id": "k2"})),
    ]);

    let outcome = pipeline.handle(event, context()).await.unwrap();

    assert_eq!(
        outcome,
        InvocationOutcome::Replaced(json!({
            "request_id": "req-1",
            "items": 2,
            "ids": ["k1", "k2"],
            "documents": [true, false]
        }))
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn before_hook_runs_first_and_can_fail() {
    init_test_tracing();

    let before_calls = Counter::default();
    let hook_calls = before_calls.clone();
    let options = PipelineOptions::new(json!({"index": "i"})).before(
        move |event: Arc<Value>, _context: Arc<InvocationContext>| {
            hook_calls.increment();
            async move {
                if event.get("Records").is_none() {
                    return Err(indexer_error!(ErrorKind::HookFailed, "Event rejected"));
                }
                Ok(())
            }
        },
    );
    let (pipeline, client) = create_pipeline(options);

    let err = pipeline.handle(json!({"records": []}), context()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HookFailed);

    pipeline
        .handle(stream_event(vec![]), context())
        .await
        .unwrap();
    assert_eq!(before_calls.get(), 2);
    assert_eq!(client.calls().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_hook_recovers_batch_errors() {
    init_test_tracing();

    let options = PipelineOptions::new(json!({"index": "i"})).error(
        |_event: Arc<Value>, _context: Arc<InvocationContext>, err: IndexerError| async move {
            match err.kind() {
                ErrorKind::InvalidEventShape => Ok(Some(json!({"recovered": true}))),
                _ => Ok(None),
            }
        },
    );
    let (pipeline, client) = create_pipeline(options);

    let outcome = pipeline.handle(json!({"Records": "nope"}), context()).await.unwrap();
    assert_eq!(outcome, InvocationOutcome::Replaced(json!({"recovered": true})));

    let err = indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "down");
    client.fail_always(err.clone()).await;
    let event = stream_event(vec![insert_record(json!({"id": "k1"}), json!({"id": "k1"}))]);

    assert_eq!(pipeline.handle(event, context()).await.unwrap_err(), err);
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_options_are_forwarded() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(
        json!({"index": "i", "bulk": {"refresh": "wait_for", "timeout": "5s"}}),
    ));
    let event = stream_event(vec![insert_record(json!({"id": "k1"}), json!({"id": "k1"}))]);

    pipeline.handle(event, context()).await.unwrap();

    let requests = client.requests().await;
    let request = &requests[0];
    assert_eq!(request.options["refresh"], json!("wait_for"));
    assert_eq!(request.options["timeout"], json!("5s"));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_invocations_share_the_client() {
    init_test_tracing();

    let (pipeline, client) = create_pipeline(PipelineOptions::new(json!({"index": "i"})));

    let handles = (0..8)
        .map(|n| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let id = format!("k{n}");
                let record = insert_record(json!({"id": id}), json!({"id": id}));
                let event = stream_event(vec![record]);
                pipeline
                    .handle(event, InvocationContext::with_request_id(format!("req-{n}")))
                    .await
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.calls().await, 8);
}
