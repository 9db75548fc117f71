//! HTTP surface: router, shared state, and the three handlers.
//!
//! Routes are mounted twice, at the root and under `/api`, so the service
//! answers both direct calls and a frontend that proxies through `/api/*`.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | [`index`] |
//! | `POST /upload` | [`upload`] — quiz |
//! | `POST /recap` | [`recap`] |
//!
//! Status codes follow the error taxonomy in [`crate::error`]: input problems
//! are 400, extraction failures 500, and generation failures are a 200 with
//! an `error` key in the body.

use crate::config::ServerConfig;
use crate::error::{PdfQuizError, RequestError};
use crate::output::{inspect_quiz, inspect_recap, Finding};
use crate::pipeline::extract::{self, LopdfExtractor, TextExtractor};
use crate::pipeline::llm::{self, Capability, Generator};
use crate::pipeline::upload::{self, UploadForm, UploadedPdf};
use crate::prompts;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Process-wide state handed to every handler. Read-only after startup.
pub struct AppState {
    pub extractor: Arc<dyn TextExtractor>,
    pub generator: Arc<dyn Generator>,
    pub default_questions: i64,
    pub inspect_responses: bool,
    pub max_upload_bytes: Option<usize>,
}

impl AppState {
    /// State with the given collaborators and settings from `config`.
    pub fn new(
        config: &ServerConfig,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            extractor,
            generator,
            default_questions: config.default_questions,
            inspect_responses: config.inspect_responses,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// Production state: lopdf extraction and the configured generator.
    pub fn from_config(config: &ServerConfig) -> Result<Self, PdfQuizError> {
        let generator = llm::build_generator(config)?;
        Ok(Self::new(config, Arc::new(LopdfExtractor), generator))
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = match state.max_upload_bytes {
        Some(bytes) => DefaultBodyLimit::max(bytes),
        None => DefaultBodyLimit::disable(),
    };

    let routes = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/recap", post(recap));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.socket_addr()` and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<(), PdfQuizError> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| PdfQuizError::Bind { addr, source })?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PdfQuizError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Handlers ─────────────────────────────────────────────────────────────

pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Hello, this is the Python backend!" }))
}

/// `POST /upload`: PDF in, quiz JSON out.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RequestError> {
    let (file, num_questions) = read_upload(multipart).await?;
    let text = extract_or_500(&state, file).await?;

    let num_questions =
        upload::parse_num_questions(num_questions.as_deref(), state.default_questions);
    info!(
        "Sending {} characters to AI for {}-question quiz...",
        text.len(),
        num_questions
    );

    let prompt = prompts::quiz_prompt(&text, &num_questions);
    let body = llm::generate_or_error(state.generator.as_ref(), Capability::Quiz, &prompt).await;

    if state.inspect_responses {
        report(Capability::Quiz, &inspect_quiz(&body, num_questions.as_i64()));
    }
    Ok(json_body(body))
}

/// `POST /recap`: PDF in, recap JSON out.
pub async fn recap(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RequestError> {
    let (file, _) = read_upload(multipart).await?;
    let text = extract_or_500(&state, file).await?;

    info!("Sending {} characters to AI for recap...", text.len());

    let prompt = prompts::recap_prompt(&text);
    let body = llm::generate_or_error(state.generator.as_ref(), Capability::Recap, &prompt).await;

    if state.inspect_responses {
        report(Capability::Recap, &inspect_recap(&body));
    }
    Ok(json_body(body))
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// A body that is not multipart at all has no file part either.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(UploadedPdf, Option<String>), RequestError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Not a multipart upload: {}", rejection);
        RequestError::NoFilePart
    })?;
    upload::parse_multipart(multipart)
        .await
        .and_then(UploadForm::require_file)
        .inspect_err(|e| warn!("Rejected upload: {}", e))
}

async fn extract_or_500(state: &AppState, file: UploadedPdf) -> Result<String, RequestError> {
    extract::extract_text(Arc::clone(&state.extractor), file.data)
        .await
        .map_err(|e| {
            error!("Error processing PDF '{}': {}", file.filename, e);
            RequestError::from(e)
        })
}

/// Relay `body` verbatim with a JSON content type and status 200.
fn json_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn report(capability: Capability, findings: &[Finding]) {
    for finding in findings {
        warn!("Generated {} does not match its schema: {}", capability, finding);
    }
}
