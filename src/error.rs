//! Error types for the edgequake-pdfquiz service.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfQuizError`] — **Fatal** for the operation that raised it: the
//!   server cannot start (missing credential, provider not configured), or a
//!   document cannot be read at all (corrupt PDF).
//!
//! * [`RequestError`] — **Per request**: what the HTTP handler answers with
//!   when the upload itself is unusable. It renders straight into the
//!   `{"error": "..."}` JSON body and the matching status code.
//!
//! Generation failures are neither. They are folded into a fixed error body
//! inside [`crate::pipeline::llm::generate_or_error`] and reach the client
//! with HTTP 200, see [`GenerationError`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;
use thiserror::Error;

/// Fatal errors returned by the edgequake-pdfquiz library.
#[derive(Debug, Error)]
pub enum PdfQuizError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// The generation credential is not set.
    #[error("{var} not found. Make sure it's set in your environment or .env file.")]
    MissingCredential { var: &'static str },

    /// The named provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be parsed at all.
    #[error("{detail}")]
    CorruptPdf { detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A failed call to the remote generation service.
///
/// Never surfaces to HTTP clients as-is; the handler only ever sees the
/// capability's fixed error body.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network failure, DNS, TLS, timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status (auth, quota, …).
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered 2xx but there was no text to relay.
    #[error("empty response: {0}")]
    EmptyResponse(String),

    /// Error reported by an edgequake-llm provider.
    #[error("provider error: {0}")]
    Provider(String),
}

/// An upload the handler refuses to process.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The multipart body has no `file` field.
    #[error("No file part")]
    NoFilePart,

    /// The `file` field carries an empty filename.
    #[error("No selected file")]
    NoSelectedFile,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Malformed(String),

    /// Text extraction failed.
    #[error("Error processing PDF: {0}")]
    Processing(String),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::NoFilePart
            | RequestError::NoSelectedFile
            | RequestError::Malformed(_) => StatusCode::BAD_REQUEST,
            RequestError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PdfQuizError> for RequestError {
    fn from(e: PdfQuizError) -> Self {
        RequestError::Processing(e.to_string())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
