//! Run resources driven end to end against a wiremock server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use extend::{
    schema::{self, ObjectSchema},
    testing::test_client,
    Error, ExtractConfig, ExtractRunCreateRequest, FileInput, PollingOptions, ProcessorRef,
    ProcessorRunStatus, WorkflowRunCreateRequest, WorkflowRunStatus,
};
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Clone)]
struct SequenceResponder {
    templates: Arc<Mutex<std::collections::VecDeque<ResponseTemplate>>>,
    fallback: ResponseTemplate,
}

impl SequenceResponder {
    fn new(templates: Vec<ResponseTemplate>, fallback: ResponseTemplate) -> Self {
        Self {
            templates: Arc::new(Mutex::new(templates.into_iter().collect())),
            fallback,
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _req: &Request) -> ResponseTemplate {
        let mut templates = self.templates.lock().expect("mutex should not be poisoned");
        templates.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

fn quick_polling() -> PollingOptions {
    PollingOptions::default()
        .with_fast_poll(Duration::from_secs(5), Duration::from_millis(10))
        .with_jitter_fraction(0.0)
}

fn extract_request() -> ExtractRunCreateRequest {
    ExtractRunCreateRequest::with_extractor(
        ProcessorRef::new("ex_abc"),
        FileInput::from_url("https://example.com/invoice.pdf"),
    )
}

fn run(id: &str, status: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "object": "extract_run", "id": id, "status": status }))
}

#[tokio::test]
async fn create_and_poll_waits_for_terminal_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract_runs"))
        .respond_with(run("exr_1", "PENDING"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/exr_1"))
        .respond_with(SequenceResponder::new(
            vec![run("exr_1", "PROCESSING")],
            ResponseTemplate::new(200).set_body_json(json!({
                "object": "extract_run",
                "id": "exr_1",
                "status": "PROCESSED",
                "output": { "value": { "invoice_number": "INV-7", "total": 12.5 } }
            })),
        ))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let finished = client
        .extract_runs()
        .create_and_poll(extract_request(), &quick_polling())
        .await
        .expect("run should finish");
    assert_eq!(finished.status, ProcessorRunStatus::Processed);

    #[derive(Deserialize)]
    struct Invoice {
        invoice_number: String,
        total: f64,
    }
    let invoice: Invoice = finished.output_as().expect("decode").expect("output present");
    assert_eq!(invoice.invoice_number, "INV-7");
    assert_eq!(invoice.total, 12.5);
}

#[tokio::test]
async fn already_terminal_create_skips_retrieval() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/workflow_runs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "wr_1", "status": "FAILED" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/workflow_runs/wr_1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let finished = client
        .workflow_runs()
        .create_and_poll(
            WorkflowRunCreateRequest::new("workflow_1", FileInput::from_id("file_1")),
            &quick_polling(),
        )
        .await
        .expect("terminal create is returned");
    assert_eq!(finished.status, WorkflowRunStatus::Failed);
}

#[tokio::test]
async fn polling_deadline_surfaces_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract_runs"))
        .respond_with(run("exr_slow", "PENDING"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/exr_slow"))
        .respond_with(run("exr_slow", "PROCESSING"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .extract_runs()
        .create_and_poll(
            extract_request(),
            &quick_polling().with_max_wait(Duration::from_millis(50)),
        )
        .await
        .expect_err("run never finishes");
    match err {
        Error::PollingTimeout(timeout) => {
            assert_eq!(timeout.max_wait, Duration::from_millis(50));
            assert!(timeout.elapsed >= timeout.max_wait);
        }
        other => panic!("expected polling timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn retrieval_errors_propagate_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract_runs"))
        .respond_with(run("exr_gone", "PENDING"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/extract_runs/exr_gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "code": "NOT_FOUND", "message": "gone" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .extract_runs()
        .create_and_poll(extract_request(), &quick_polling())
        .await
        .expect_err("retrieve fails");
    match err {
        Error::Api(api) => assert_eq!(api.message, "gone"),
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn inline_config_embeds_converted_schema() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/extract_runs"))
        .and(body_partial_json(json!({
            "config": {
                "schema": {
                    "type": "object",
                    "properties": {
                        "vendor": { "type": ["string", "null"] },
                        "total": {
                            "type": "object",
                            "extend:type": "currency"
                        }
                    },
                    "required": ["vendor", "total"],
                    "additionalProperties": false
                },
                "baseProcessor": "extraction_performance"
            }
        })))
        .respond_with(run("exr_cfg", "PROCESSED"))
        .expect(1)
        .mount(&server)
        .await;

    let fields = ObjectSchema::new()
        .field("vendor", schema::string())
        .field("total", schema::extend_currency());
    let config = ExtractConfig::from_schema(&fields)
        .expect("schema converts")
        .with("baseProcessor", json!("extraction_performance"));

    let client = test_client(&server.uri());
    let created = client
        .extract_runs()
        .create(ExtractRunCreateRequest::with_config(
            config,
            FileInput::from_text("Vendor: ACME\nTotal: 12.50 USD"),
        ))
        .await
        .expect("create");
    assert_eq!(created.id.as_str(), "exr_cfg");
}
