//! HTTP-level tests for the upload and recap endpoints.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the PDF
//! extractor and the generation backend are replaced by stubs so no network
//! or real model is involved.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use edgequake_pdfquiz::prompts::{quiz_prompt, recap_prompt};
use edgequake_pdfquiz::{router, AppState, GenerationError, Generator, PdfQuizError, TextExtractor};
use serde_json::{json, Value};
use std::io;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

// ── Stubs ────────────────────────────────────────────────────────────────────

/// Returns fixed page texts, or fails like a corrupt document.
struct StubExtractor {
    pages: Result<Vec<&'static str>, &'static str>,
}

impl TextExtractor for StubExtractor {
    fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, PdfQuizError> {
        match &self.pages {
            Ok(pages) => Ok(pages.iter().map(|p| p.to_string()).collect()),
            Err(detail) => Err(PdfQuizError::CorruptPdf {
                detail: detail.to_string(),
            }),
        }
    }
}

/// Records every prompt; answers with `reply` or fails.
struct RecordingGenerator {
    reply: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("generator was not called")
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Some(r) => Ok(r.to_string()),
            None => Err(GenerationError::Transport("connection reset".into())),
        }
    }

    fn model(&self) -> &str {
        "stub"
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const BOUNDARY: &str = "X-PDFQUIZ-BOUNDARY";

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn pdf_part() -> Part<'static> {
    Part::File {
        name: "file",
        filename: "notes.pdf",
        data: b"%PDF-1.5 stub",
    }
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app(extractor: StubExtractor, generator: Arc<RecordingGenerator>) -> Router {
    router(Arc::new(AppState {
        extractor: Arc::new(extractor),
        generator,
        default_questions: 5,
        inspect_responses: true,
        max_upload_bytes: None,
    }))
}

fn cats() -> StubExtractor {
    StubExtractor {
        pages: Ok(vec!["Cats are mammals.", ""]),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, content_type, body)
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("body is JSON")
}

/// Collects formatted log lines for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ── GET / ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn index_greets_at_root_and_api() {
    for uri in ["/", "/api"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(
            as_json(&body),
            json!({ "message": "Hello, this is the Python backend!" })
        );
    }
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_part_is_400_on_both_endpoints() {
    for uri in ["/upload", "/recap", "/api/upload", "/api/recap"] {
        let generator = RecordingGenerator::replying("{}");
        let req = multipart_request(
            uri,
            &[Part::Text {
                name: "num_questions",
                value: "3",
            }],
        );
        let (status, _, body) = send(app(cats(), generator.clone()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(as_json(&body), json!({ "error": "No file part" }), "{uri}");
        assert_eq!(generator.calls(), 0);
    }
}

#[tokio::test]
async fn non_multipart_body_has_no_file_part() {
    let req = Request::builder()
        .method("POST")
        .uri("/recap")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body), json!({ "error": "No file part" }));
}

#[tokio::test]
async fn text_field_named_file_is_not_a_file_part() {
    let req = multipart_request(
        "/upload",
        &[Part::Text {
            name: "file",
            value: "hello",
        }],
    );
    let (status, _, body) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body), json!({ "error": "No file part" }));
}

#[tokio::test]
async fn typed_part_without_filename_is_not_a_file_part() {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         %PDF-1.5\r\n\
         --{BOUNDARY}--\r\n"
    );
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let generator = RecordingGenerator::replying("{}");
    let (status, _, body) = send(app(cats(), generator.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body), json!({ "error": "No file part" }));
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn empty_filename_is_400_on_both_endpoints() {
    for uri in ["/upload", "/recap"] {
        let req = multipart_request(
            uri,
            &[Part::File {
                name: "file",
                filename: "",
                data: b"",
            }],
        );
        let (status, _, body) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(as_json(&body), json!({ "error": "No selected file" }));
    }
}

#[tokio::test]
async fn rejected_uploads_are_logged() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let req = multipart_request(
        "/upload",
        &[Part::Text {
            name: "num_questions",
            value: "3",
        }],
    );
    let (status, _, _) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = multipart_request(
        "/recap",
        &[Part::File {
            name: "file",
            filename: "",
            data: b"",
        }],
    );
    let (status, _, _) = send(app(cats(), RecordingGenerator::replying("{}")), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let logs = logs.contents();
    assert!(logs.contains("Rejected upload: No file part"), "{logs}");
    assert!(logs.contains("Rejected upload: No selected file"), "{logs}");
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extraction_failure_is_500_with_detail() {
    for uri in ["/upload", "/recap"] {
        let generator = RecordingGenerator::replying("{}");
        let extractor = StubExtractor {
            pages: Err("Invalid file header"),
        };
        let req = multipart_request(uri, &[pdf_part()]);
        let (status, _, body) = send(app(extractor, generator.clone()), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(
            as_json(&body),
            json!({ "error": "Error processing PDF: Invalid file header" })
        );
        assert_eq!(generator.calls(), 0, "no generation after failed extraction");
    }
}

// ── Quiz ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_scenario_relays_generator_output() {
    let generator = RecordingGenerator::replying(r#"{"questions":[]}"#);
    let req = multipart_request("/upload", &[pdf_part()]);
    let (status, content_type, body) = send(app(cats(), generator.clone()), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, br#"{"questions":[]}"#);
    assert_eq!(generator.last_prompt(), quiz_prompt("Cats are mammals.\n\n", 5));
}

#[tokio::test]
async fn num_questions_is_parsed_without_clamping() {
    let cases = [
        (None, 5),
        (Some("abc"), 5),
        (Some(""), 5),
        (Some("12"), 12),
        (Some("0"), 0),
        (Some("-4"), -4),
    ];
    for (raw, expected) in cases {
        let generator = RecordingGenerator::replying(r#"{"questions":[]}"#);
        let mut parts = vec![pdf_part()];
        if let Some(value) = raw {
            parts.push(Part::Text {
                name: "num_questions",
                value,
            });
        }
        let req = multipart_request("/upload", &parts);
        let (status, _, _) = send(app(cats(), generator.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            generator.last_prompt(),
            quiz_prompt("Cats are mammals.\n\n", expected),
            "num_questions={raw:?}"
        );
    }
}

#[tokio::test]
async fn num_questions_before_file_is_honoured() {
    let generator = RecordingGenerator::replying("{}");
    let req = multipart_request(
        "/api/upload",
        &[
            Part::Text {
                name: "num_questions",
                value: "2",
            },
            pdf_part(),
        ],
    );
    let (status, _, _) = send(app(cats(), generator.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(generator.last_prompt().contains("generate a 2-question"));
}

#[tokio::test]
async fn first_num_questions_value_wins() {
    let generator = RecordingGenerator::replying("{}");
    let req = multipart_request(
        "/upload",
        &[
            Part::Text {
                name: "num_questions",
                value: "3",
            },
            pdf_part(),
            Part::Text {
                name: "num_questions",
                value: "9",
            },
        ],
    );
    let (status, _, _) = send(app(cats(), generator.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(generator.last_prompt().contains("generate a 3-question"));
}

#[tokio::test]
async fn huge_and_underscored_counts_reach_the_prompt() {
    let cases = [
        ("99999999999999999999", "99999999999999999999"),
        ("-123456789012345678901", "-123456789012345678901"),
        ("1_000", "1000"),
        (" 007 ", "7"),
    ];
    for (raw, shown) in cases {
        let generator = RecordingGenerator::replying(r#"{"questions":[]}"#);
        let req = multipart_request(
            "/upload",
            &[
                pdf_part(),
                Part::Text {
                    name: "num_questions",
                    value: raw,
                },
            ],
        );
        let (status, _, _) = send(app(cats(), generator.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            generator.last_prompt(),
            quiz_prompt("Cats are mammals.\n\n", shown),
            "num_questions={raw:?}"
        );
    }
}

#[tokio::test]
async fn generation_failure_is_200_with_error_body() {
    let cases = [
        ("/upload", "Failed to generate quiz from AI"),
        ("/recap", "Failed to generate recap from AI"),
    ];
    for (uri, message) in cases {
        let req = multipart_request(uri, &[pdf_part()]);
        let app = app(cats(), RecordingGenerator::failing());
        let (status, content_type, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(as_json(&body), json!({ "error": message }));
    }
}

#[tokio::test]
async fn malformed_generator_output_is_not_touched() {
    let raw = "  {\"questions\": [ {\"question\": \"unterminated\"  \n";
    let generator = RecordingGenerator::replying(raw);
    let req = multipart_request("/upload", &[pdf_part()]);
    let (status, _, body) = send(app(cats(), generator), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, raw.as_bytes());
}

// ── Recap ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recap_relays_verbatim_and_ignores_num_questions() {
    let raw = "{ \"recap\" : \"Cats are mammals.\",\n  \"extra\": 1 }";
    let generator = RecordingGenerator::replying(raw);
    let req = multipart_request(
        "/recap",
        &[
            pdf_part(),
            Part::Text {
                name: "num_questions",
                value: "9",
            },
        ],
    );
    let (status, content_type, body) = send(app(cats(), generator.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, raw.as_bytes());
    assert_eq!(generator.last_prompt(), recap_prompt("Cats are mammals.\n\n"));
}

// ── CORS ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn any_origin_is_allowed() {
    let req = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://quiz.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app(cats(), RecordingGenerator::replying("{}"))
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}
