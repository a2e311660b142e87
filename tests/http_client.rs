//! HTTP client tests using wiremock mock server.
//!
//! These tests verify:
//! - Auth and version headers on every request
//! - API error parsing
//! - Retry behavior
//! - Request validation before any network call

use std::sync::{Arc, Mutex};
use std::time::Duration;

use extend::{
    testing::{test_client, test_client_with_retry},
    Client, Config, Error, ExtractRunCreateRequest, FileInput, HttpRequestMetrics,
    MetricsCallbacks, ProcessorRef, ProcessorRunStatus, RetryConfig, RunId, API_VERSION_HEADER,
    DEFAULT_API_VERSION,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Clone)]
struct SequenceResponder {
    templates: Arc<Mutex<std::collections::VecDeque<ResponseTemplate>>>,
}

impl SequenceResponder {
    fn new(templates: Vec<ResponseTemplate>) -> Self {
        Self {
            templates: Arc::new(Mutex::new(templates.into_iter().collect())),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        let mut templates = self.templates.lock().expect("mutex should not be poisoned");
        templates.pop_front().unwrap_or_else(|| {
            ResponseTemplate::new(500).set_body_json(json!({
                "code": "MOCK_EXHAUSTED",
                "message": "No more mock responses configured"
            }))
        })
    }
}

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

fn run_json(id: &str, status: &str) -> serde_json::Value {
    json!({ "object": "extract_run", "id": id, "status": status })
}

#[tokio::test]
async fn retrieve_sends_auth_and_version_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/exr_1"))
        .and(header("authorization", "Bearer sk_test"))
        .and(header(API_VERSION_HEADER, DEFAULT_API_VERSION))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("exr_1", "PROCESSING")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let run = client
        .extract_runs()
        .retrieve(&RunId::new("exr_1"))
        .await
        .expect("retrieve should succeed");
    assert_eq!(run.status, ProcessorRunStatus::Processing);
    assert_eq!(run.object.as_deref(), Some("extract_run"));
}

#[tokio::test]
async fn create_posts_camel_case_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract_runs"))
        .and(body_partial_json(json!({
            "extractor": { "id": "ex_abc" },
            "file": { "url": "https://example.com/a.pdf" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("exr_2", "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let run = client
        .extract_runs()
        .create(ExtractRunCreateRequest::with_extractor(
            ProcessorRef::new("ex_abc"),
            FileInput::from_url("https://example.com/a.pdf"),
        ))
        .await
        .expect("create should succeed");
    assert_eq!(run.id.as_str(), "exr_2");
}

#[tokio::test]
async fn api_errors_are_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-request-id", "req_123")
                .set_body_json(json!({ "code": "NOT_FOUND", "message": "run not found" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .extract_runs()
        .retrieve(&RunId::new("missing"))
        .await
        .expect_err("404 should fail");

    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 404);
            assert_eq!(api.code.as_deref(), Some("NOT_FOUND"));
            assert_eq!(api.message, "run not found");
            assert_eq!(api.request_id.as_deref(), Some("req_123"));
            assert!(api.is_not_found());
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_is_retried_on_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/workflow_runs/wr_1"))
        .respond_with(SequenceResponder::new(vec![
            ResponseTemplate::new(503),
            ResponseTemplate::new(200).set_body_json(json!({ "id": "wr_1", "status": "PROCESSED" })),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client_with_retry(&server.uri(), fast_retry(3));
    let run = client
        .workflow_runs()
        .retrieve(&RunId::new("wr_1"))
        .await
        .expect("second attempt should succeed");
    assert_eq!(run.id.as_str(), "wr_1");
}

#[tokio::test]
async fn post_is_not_retried_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify_runs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client_with_retry(&server.uri(), fast_retry(3));
    let request = serde_json::from_value(json!({
        "classifier": { "id": "cl_1" },
        "file": { "id": "file_1" }
    }))
    .expect("request");
    let err = client
        .classify_runs()
        .create(request)
        .await
        .expect_err("500 should fail");
    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 500);
            assert_eq!(api.message, "boom");
            assert_eq!(api.attempts, 1);
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_request_is_not_sent() {
    let server = MockServer::start().await;
    let client = test_client(&server.uri());

    let err = client
        .extract_runs()
        .create(ExtractRunCreateRequest::with_extractor(
            ProcessorRef::new("ex_abc"),
            FileInput::default(),
        ))
        .await
        .expect_err("missing file source should fail");
    match err {
        Error::Validation(ve) => assert_eq!(ve.field.as_deref(), Some("file")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = client
        .split_runs()
        .retrieve(&RunId::new("  "))
        .await
        .expect_err("blank id should fail");
    assert!(matches!(err, Error::Validation(_)));

    let requests = server
        .received_requests()
        .await
        .expect("should be able to read received requests");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn metrics_callback_sees_status_and_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/exr_9"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req_9")
                .set_body_json(run_json("exr_9", "PROCESSED")),
        )
        .mount(&server)
        .await;

    let seen: Arc<Mutex<Vec<HttpRequestMetrics>>> = Arc::default();
    let sink = seen.clone();
    let client = Client::new(Config {
        base_url: Some(server.uri()),
        api_key: Some("sk_test".into()),
        retry: Some(RetryConfig::disabled()),
        metrics: Some(MetricsCallbacks::default().with_http_request(move |m| {
            sink.lock().expect("lock").push(m.clone());
        })),
        ..Default::default()
    })
    .expect("client");

    client
        .extract_runs()
        .retrieve(&RunId::new("exr_9"))
        .await
        .expect("retrieve");

    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, Some(200));
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/extract_runs/exr_9");
    assert_eq!(seen[0].request_id.as_deref(), Some("req_9"));
    assert_eq!(seen[0].attempts, 1);
}

#[tokio::test]
async fn run_id_is_encoded_as_a_single_path_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/workflow_runs/wr%2F..%2Fadmin%3Fx=1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "wr/../admin?x=1", "status": "PROCESSING" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let run = client
        .workflow_runs()
        .retrieve(&RunId::new("wr/../admin?x=1"))
        .await
        .expect("retrieve should hit the encoded path");
    assert_eq!(run.id.as_str(), "wr/../admin?x=1");
}

#[tokio::test]
async fn exhausted_read_retries_report_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/split_runs/spr_1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client_with_retry(&server.uri(), fast_retry(2));
    let err = client
        .split_runs()
        .retrieve(&RunId::new("spr_1"))
        .await
        .expect_err("still unavailable");
    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 503);
            assert_eq!(api.attempts, 2);
            assert_eq!(api.message, "Service Unavailable");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}
