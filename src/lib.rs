//! # edgequake-pdfquiz
//!
//! A small HTTP backend that turns an uploaded PDF into a multiple-choice
//! quiz or a short recap, generated by a hosted LLM and returned as JSON.
//!
//! ## Request Pipeline
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Upload   validate the `file` part, keep bytes in memory
//!  ├─ 2. Extract  per-page text via lopdf (spawn_blocking), joined with "\n"
//!  ├─ 3. Prompt   quiz or recap template around the text
//!  ├─ 4. Generate any edgequake-llm provider in JSON mode (Gemini default)
//!  └─ 5. Respond  model output relayed verbatim, `application/json`
//! ```
//!
//! ## Endpoints
//!
//! | Method/Path | Body | Answer |
//! |-------------|------|--------|
//! | `GET /` | — | greeting JSON |
//! | `POST /upload` | `file`, optional `num_questions` | quiz JSON |
//! | `POST /recap` | `file` | recap JSON |
//!
//! The same routes are also served under `/api`.
//!
//! A generation failure is answered with **HTTP 200** and a body such as
//! `{ "error": "Failed to generate quiz from AI" }`; clients must check for
//! an `error` key, not only the status code.
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use edgequake_pdfquiz::{server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder()
//!         .api_key(std::env::var("GOOGLE_API_KEY")?)
//!         .build()?;
//!     server::serve(&config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfquiz` binary (clap + anyhow + dotenvy + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProviderKind, ServerConfig, ServerConfigBuilder};
pub use error::{GenerationError, PdfQuizError, RequestError};
pub use output::{Difficulty, Finding, Question, Quiz, Recap};
pub use pipeline::extract::{extract_text, join_pages, LopdfExtractor, TextExtractor};
pub use pipeline::llm::{Capability, GeminiGenerator, Generator, ProviderGenerator};
pub use pipeline::upload::QuestionCount;
pub use server::{router, AppState};
