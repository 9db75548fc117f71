//! Pipeline stages for turning an uploaded PDF into a quiz or recap.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and swapped (e.g. a different extractor) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ extract ──▶ prompts ──▶ llm ──▶ HTTP body
//! (multipart) (lopdf)    (template)  (Gemini / edgequake-llm)
//! ```
//!
//! 1. [`upload`]  — read the multipart body into memory, check presence of
//!    the file, parse `num_questions`
//! 2. [`extract`] — per-page text joined with `\n`; runs in
//!    `spawn_blocking`
//! 3. [`crate::prompts`] — embed the text in the capability's template
//! 4. [`llm`]     — the only stage with network I/O; failures become a fixed
//!    error body instead of an `Err`

pub mod extract;
pub mod llm;
pub mod upload;
