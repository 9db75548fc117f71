//! Upload handling: turn a multipart request into an in-memory document.
//!
//! The uploaded file is never written to disk. Its bytes stay in a
//! reference-counted [`Bytes`] buffer owned by the request and are dropped
//! once extraction returns.
//!
//! A field only counts as the upload when it is named `file` *and* carries a
//! `filename` parameter in its `Content-Disposition` (possibly empty). Any
//! other part named `file`, with or without a `Content-Type`, is a form value.
//! Repeated fields keep their first value.

use crate::error::RequestError;
use axum::body::Bytes;
use axum::extract::Multipart;
use std::fmt;
use tracing::debug;

/// Form field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// Optional form field carrying the requested question count.
pub const NUM_QUESTIONS_FIELD: &str = "num_questions";

/// A PDF received in a request, held in memory.
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    pub filename: String,
    pub data: Bytes,
}

/// Fields collected from the multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// First `file` part seen, if any.
    pub file: Option<UploadedPdf>,
    /// First raw `num_questions` value, if sent.
    pub num_questions: Option<String>,
}

impl UploadForm {
    /// Apply the presence checks every endpoint shares and hand out the file.
    pub fn require_file(self) -> Result<(UploadedPdf, Option<String>), RequestError> {
        let file = self.file.ok_or(RequestError::NoFilePart)?;
        if file.filename.is_empty() {
            return Err(RequestError::NoSelectedFile);
        }
        Ok((file, self.num_questions))
    }
}

/// Read every field of a multipart body.
///
/// Unknown fields are drained and ignored. Only the first `file` part is
/// kept.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, RequestError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RequestError::Malformed(format!("Failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        let is_file_part = field.file_name().is_some();
        let filename = field.file_name().unwrap_or("").to_string();

        match (name.as_str(), is_file_part) {
            (FILE_FIELD, true) if form.file.is_none() => {
                let data = field.bytes().await.map_err(|e| {
                    RequestError::Malformed(format!("Failed to read file data: {e}"))
                })?;
                debug!("Received '{}' ({} bytes)", filename, data.len());
                form.file = Some(UploadedPdf { filename, data });
            }
            (NUM_QUESTIONS_FIELD, false) if form.num_questions.is_none() => {
                let value = field.text().await.map_err(|e| {
                    RequestError::Malformed(format!("Failed to read num_questions: {e}"))
                })?;
                form.num_questions = Some(value);
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    Ok(form)
}

/// A requested question count, kept as its canonical decimal literal.
///
/// Any integer is representable, so a count too large for a machine integer
/// still reaches the prompt unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCount(String);

impl QuestionCount {
    /// Parse an integer literal: surrounding whitespace, an optional sign,
    /// ASCII digits, and single underscores between digits.
    ///
    /// Leading zeros, underscores and a `+` sign are dropped from the
    /// canonical form; `-0` is `0`.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if digits.is_empty()
            || digits.starts_with('_')
            || digits.ends_with('_')
            || digits.contains("__")
            || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'_')
        {
            return None;
        }

        let digits: String = digits.chars().filter(|&c| c != '_').collect();
        let magnitude = digits.trim_start_matches('0');
        Some(Self(match (magnitude.is_empty(), negative) {
            (true, _) => "0".to_string(),
            (false, true) => format!("-{magnitude}"),
            (false, false) => magnitude.to_string(),
        }))
    }

    /// The count as an `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for QuestionCount {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the requested question count.
///
/// Anything that is not an integer literal falls back to `default`. No bounds
/// are applied: zero, negative and arbitrarily large counts pass through.
pub fn parse_num_questions(raw: Option<&str>, default: i64) -> QuestionCount {
    raw.and_then(QuestionCount::parse)
        .unwrap_or_else(|| QuestionCount::from(default))
}
