//! Integration tests against an in-process mock backend.
//!
//! Each test binds an axum router to `127.0.0.1:0`, points a `ClientConfig`
//! at it and drives a real upload over HTTP. Every request, routed or not, is
//! appended to a shared log so the tests can assert the exact attempt order.

use axum::extract::Multipart;
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post, MethodRouter};
use axum::{Json, Router};
use pdfmind::{
    upload_bytes, upload_to_file, ClientConfig, ResponseShape, UploadError, UploadFile,
    UploadResult, Uploader,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn hits(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Router whose unmatched requests are logged and answered with an empty 404.
fn backend(log: &Log) -> Router {
    let log = log.clone();
    Router::new().fallback(move |uri: Uri| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(uri.path().to_string());
            StatusCode::NOT_FOUND
        }
    })
}

/// POST route that logs `path` and answers with `status` and `body`.
fn answer(log: &Log, path: &'static str, status: StatusCode, body: Value) -> MethodRouter {
    let log = log.clone();
    post(move || {
        let log = log.clone();
        let body = body.clone();
        async move {
            log.lock().unwrap().push(path.to_string());
            (status, Json(body))
        }
    })
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(base_url: &str, endpoints: &[&str]) -> ClientConfig {
    ClientConfig::builder()
        .base_url(base_url)
        .endpoints(endpoints.iter().copied())
        .build()
        .unwrap()
}

fn document() -> Value {
    json!({
        "summary": "A short paper about widgets.",
        "keywords": ["widgets", "manufacturing"],
        "headings": [
            {
                "title": "Introduction",
                "content": "Why widgets matter.",
                "start_page": 1, "start_line": 1, "end_page": 1, "end_line": 20,
                "subheadings": [
                    {"title": "Scope", "content": "Only blue widgets.",
                     "start_page": 1, "start_line": 21, "end_page": 2, "end_line": 3,
                     "subheadings": []}
                ]
            },
            {
                "title": "Results",
                "content": "Widgets work.",
                "start_page": 3, "start_line": 1, "end_page": 5, "end_line": 40,
                "subheadings": []
            }
        ]
    })
}

fn data_json(result: &UploadResult) -> Value {
    serde_json::to_value(result.data.as_ref().expect("data")).unwrap()
}

const PDF: &[u8] = b"%PDF-1.7\n%fake body\n";

// ── Response shapes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn direct_document_is_returned_unchanged() {
    let log = new_log();
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, document()));
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.message, "Document processed successfully");
    assert_eq!(result.filename, "paper.pdf");
    assert_eq!(result.shape, ResponseShape::DirectDocument);
    assert_eq!(data_json(&result), document());
}

#[tokio::test]
async fn gemini_wrapped_fenced_json_is_unwrapped() {
    let log = new_log();
    let text = format!("Here is the analysis:\n```json\n{}\n```\n", document());
    let body = json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"},
                                      "finishReason": "STOP"}]});
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, body));
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    assert!(result.success);
    assert!(!result.degraded);
    assert_eq!(result.shape, ResponseShape::WrappedGenerated);
    assert_eq!(data_json(&result), document());
}

#[tokio::test]
async fn truncated_gemini_output_is_recovered() {
    let log = new_log();
    let text = "```json\n{\"summary\": \"Cut short\", \"headings\": [{\"title\": \"Only section\", \
                \"content\": \"The model stopped here\"";
    let body = json!({"candidates": [{"content": {"parts": [{"text": text}]}}]});
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, body));
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.degraded);
    let doc = result.data.unwrap();
    assert_eq!(doc.summary, "Cut short");
    assert_eq!(doc.headings[0].title, "Only section");
}

#[tokio::test]
async fn envelope_failure_is_propagated() {
    let log = new_log();
    let body = json!({"success": false, "message": "PDF is password protected"});
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, body));
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "PDF is password protected");
    assert!(result.data.is_none());
    assert_eq!(result.shape, ResponseShape::EnvelopeWithData);
}

#[tokio::test]
async fn non_json_body_is_passed_through_as_raw() {
    let log = new_log();
    let app = backend(&log).route(
        "/summarize",
        post(|| async { (StatusCode::OK, "<html>proxy login</html>") }),
    );
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.shape, ResponseShape::Unrecognized);
    assert_eq!(result.raw, Some(json!("<html>proxy login</html>")));
}

// ── Endpoint and transport fallback ─────────────────────────────────────────

#[tokio::test]
async fn not_found_moves_on_without_a_third_attempt() {
    let log = new_log();
    let app = backend(&log).route("/upload", answer(&log, "/upload", StatusCode::OK, document()));
    let base = spawn(app).await;

    let result = upload_bytes(
        "paper.pdf",
        PDF,
        &config(&base, &["/summarize", "/upload", "/api/upload"]),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.endpoint, "/upload");
    assert_eq!(hits(&log), vec!["/summarize", "/upload"]);
}

#[tokio::test]
async fn all_not_found_fails_with_404() {
    let log = new_log();
    let base = spawn(backend(&log)).await;

    let err = upload_bytes("paper.pdf", PDF, &config(&base, &["/a", "/b", "/c"]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(!err.is_network_error());
    assert_eq!(hits(&log), vec!["/a", "/b", "/c"]);

    let envelope = err.to_envelope();
    assert!(!envelope.success);
    assert_eq!(envelope.details.status, Some(404));
    assert_eq!(envelope.details.status_text.as_deref(), Some("Not Found"));
}

#[tokio::test]
async fn server_error_is_retried_once_on_the_secondary_transport() {
    let log = new_log();
    let app = backend(&log)
        .route(
            "/summarize",
            answer(
                &log,
                "/summarize",
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"message": "model overloaded"}),
            ),
        )
        .route("/upload", answer(&log, "/upload", StatusCode::OK, document()));
    let base = spawn(app).await;

    let result = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize", "/upload"]))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(hits(&log), vec!["/summarize", "/summarize", "/upload"]);
}

#[tokio::test]
async fn last_error_carries_backend_body() {
    let log = new_log();
    let app = backend(&log).route(
        "/summarize",
        answer(
            &log,
            "/summarize",
            StatusCode::BAD_GATEWAY,
            json!({"message": "upstream model unavailable", "error": "bad_gateway"}),
        ),
    );
    let base = spawn(app).await;

    let err = upload_bytes("paper.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap_err();

    match &err {
        UploadError::UpstreamFailure { status, body, .. } => {
            assert_eq!(*status, 502);
            assert_eq!(body.as_ref().unwrap()["error"], "bad_gateway");
        }
        other => panic!("expected UpstreamFailure, got {other:?}"),
    }
    let envelope = err.to_envelope();
    assert_eq!(envelope.message, "upstream model unavailable");
    assert_eq!(envelope.error, "bad_gateway");
}

#[tokio::test]
async fn connection_refused_is_a_network_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = upload_bytes(
        "paper.pdf",
        PDF,
        &config(&format!("http://{addr}"), &["/summarize", "/upload"]),
    )
    .await
    .unwrap_err();

    assert!(err.is_network_error(), "got {err:?}");
    assert_eq!(err.status(), None);
    let envelope = err.to_envelope();
    assert!(envelope.is_network_error);
    assert_eq!(envelope.details.code.as_deref(), Some("ERR_NETWORK"));
}

#[tokio::test]
async fn slow_backend_times_out_per_attempt() {
    let log = new_log();
    let app = backend(&log).route(
        "/slow",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(document())
        }),
    );
    let base = spawn(app).await;

    let config = ClientConfig::builder()
        .base_url(&base)
        .endpoints(["/slow"])
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let err = upload_bytes("paper.pdf", PDF, &config).await.unwrap_err();

    assert!(err.is_network_error());
    assert_eq!(err.to_envelope().details.code.as_deref(), Some("ECONNABORTED"));
}

// ── Request contents and idempotence ────────────────────────────────────────

#[derive(Debug, Clone)]
struct SeenField {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[tokio::test]
async fn multipart_form_carries_file_and_filename() {
    let seen: Arc<Mutex<Vec<SeenField>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let app = Router::new().route(
        "/summarize",
        post(move |mut form: Multipart| {
            let sink = sink.clone();
            async move {
                while let Some(field) = form.next_field().await.unwrap() {
                    let name = field.name().unwrap_or_default().to_string();
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.unwrap().to_vec();
                    sink.lock().unwrap().push(SeenField {
                        name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                Json(document())
            }
        }),
    );
    let base = spawn(app).await;

    upload_bytes("quarterly report.pdf", PDF, &config(&base, &["/summarize"]))
        .await
        .unwrap();

    let fields = seen.lock().unwrap().clone();
    assert_eq!(fields.len(), 2, "got {fields:?}");
    let file = fields.iter().find(|f| f.name == "file").unwrap();
    assert_eq!(file.file_name.as_deref(), Some("quarterly report.pdf"));
    assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(file.data, PDF);
    let filename = fields.iter().find(|f| f.name == "filename").unwrap();
    assert_eq!(filename.data, b"quarterly report.pdf");
}

#[tokio::test]
async fn repeated_uploads_yield_identical_data() {
    let log = new_log();
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, document()));
    let base = spawn(app).await;

    let uploader = Uploader::new(config(&base, &["/summarize"])).unwrap();
    let file = UploadFile::new("paper.pdf", PDF.to_vec());
    let first = uploader.upload(&file).await.unwrap();
    let second = uploader.upload(&file).await.unwrap();

    assert_eq!(first.data, second.data);
    assert!(first.processing_time > 0);
    assert!(second.processing_time >= first.processing_time);
}

#[tokio::test]
async fn upload_to_file_writes_the_result() {
    let log = new_log();
    let app = backend(&log).route("/summarize", answer(&log, "/summarize", StatusCode::OK, document()));
    let base = spawn(app).await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("paper.pdf");
    std::fs::write(&input, PDF).unwrap();
    let output = dir.path().join("out").join("paper.json");

    let result = upload_to_file(
        input.to_str().unwrap(),
        &output,
        &config(&base, &["/summarize"]),
    )
    .await
    .unwrap();

    let written: UploadResult =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written, result);
    assert_eq!(written.filename, "paper.pdf");
}

// ── Probing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn probe_health_reflects_status() {
    let log = new_log();
    let healthy = spawn(
        backend(&log).route("/health", get(|| async { Json(json!({"status": "ok"})) })),
    )
    .await;
    let unhealthy = spawn(backend(&log)).await;

    let up = Uploader::new(config(&healthy, &["/summarize"])).unwrap();
    assert!(up.probe_health().await);
    let down = Uploader::new(config(&unhealthy, &["/summarize"])).unwrap();
    assert!(!down.probe_health().await);
}

#[tokio::test]
async fn discover_lists_routes_answering_200_in_probe_order() {
    let log = new_log();
    let app = backend(&log)
        .route("/api/status", get(|| async { "up" }))
        .route("/health", get(|| async { "ok" }))
        .route("/summarize", post(|| async { "post only" }))
        .route(
            "/process",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
    let base = spawn(app).await;

    let up = Uploader::new(config(&base, &["/summarize"])).unwrap();
    assert_eq!(up.discover_endpoints().await, vec!["/health", "/api/status"]);
}
