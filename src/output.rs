//! Typed view of generated quizzes and recaps, plus the inspection layer.
//!
//! The server relays model output verbatim. These types are never on that
//! path: [`inspect_quiz`] and [`inspect_recap`] parse a *copy* of the body
//! and report what does not match the requested schema so it can be logged.
//! Library users who want hard guarantees can call [`Quiz::validate`]
//! themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// How hard a question is, as labelled by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    pub difficulty: Difficulty,
}

/// `{"questions": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

/// `{"recap": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recap {
    pub recap: String,
}

/// A way in which a generated body departs from its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Body is not a JSON object of the expected shape.
    Unparseable(String),
    /// The model reported an error instead of content.
    ErrorBody(String),
    /// Question `index` (0-based) has the wrong number of options.
    OptionCount { index: usize, count: usize },
    /// Question `index`'s answer is not one of its options.
    AnswerNotInOptions { index: usize },
    /// Fewer or more questions than requested.
    QuestionCount { requested: i64, got: usize },
    /// The recap string is blank.
    EmptyRecap,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Unparseable(e) => write!(f, "not a valid payload: {e}"),
            Finding::ErrorBody(e) => write!(f, "error body: {e}"),
            Finding::OptionCount { index, count } => {
                write!(f, "question {} has {} options", index + 1, count)
            }
            Finding::AnswerNotInOptions { index } => {
                write!(f, "question {} answer is not among its options", index + 1)
            }
            Finding::QuestionCount { requested, got } => {
                write!(f, "requested {requested} questions, got {got}")
            }
            Finding::EmptyRecap => f.write_str("recap is empty"),
        }
    }
}

impl Quiz {
    /// Structural checks the prompt asks the model to honour.
    pub fn validate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (index, q) in self.questions.iter().enumerate() {
            if q.options.len() != OPTIONS_PER_QUESTION {
                findings.push(Finding::OptionCount {
                    index,
                    count: q.options.len(),
                });
            }
            if !q.options.iter().any(|o| o == &q.answer) {
                findings.push(Finding::AnswerNotInOptions { index });
            }
        }
        findings
    }
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*?)\n?```$").unwrap());

/// Strip a surrounding ```` ```json ```` fence, if any.
fn unfence(body: &str) -> &str {
    let trimmed = body.trim();
    match RE_JSON_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => trimmed,
    }
}

fn error_body(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.get("error").map(|e| match e.as_str() {
        Some(s) => s.to_string(),
        None => e.to_string(),
    })
}

/// Check a generated quiz body against the schema and requested count.
///
/// `requested` is `None` when the count does not fit an `i64`; only the
/// schema is checked then.
pub fn inspect_quiz(body: &str, requested: Option<i64>) -> Vec<Finding> {
    let body = unfence(body);
    if let Some(e) = error_body(body) {
        return vec![Finding::ErrorBody(e)];
    }
    let quiz: Quiz = match serde_json::from_str(body) {
        Ok(q) => q,
        Err(e) => return vec![Finding::Unparseable(e.to_string())],
    };

    let mut findings = quiz.validate();
    let got = quiz.questions.len();
    if let Some(requested) = requested.filter(|&n| n >= 0 && got as i64 != n) {
        findings.push(Finding::QuestionCount { requested, got });
    }
    findings
}

/// Check a generated recap body against the schema.
pub fn inspect_recap(body: &str) -> Vec<Finding> {
    let body = unfence(body);
    if let Some(e) = error_body(body) {
        return vec![Finding::ErrorBody(e)];
    }
    match serde_json::from_str::<Recap>(body) {
        Ok(r) if r.recap.trim().is_empty() => vec![Finding::EmptyRecap],
        Ok(_) => Vec::new(),
        Err(e) => vec![Finding::Unparseable(e.to_string())],
    }
}
