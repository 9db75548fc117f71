//! Prompt templates for quiz and recap generation.
//!
//! Every prompt lives here so the wording can change in exactly one place and
//! unit tests can inspect it without a live model. The builders are pure:
//! they embed the extracted text verbatim and perform no validation of its
//! content or length.

use std::fmt;

/// Question count used when the request does not carry a usable one.
pub const DEFAULT_NUM_QUESTIONS: i64 = 5;

/// System message sent ahead of every prompt on the edgequake-llm path,
/// together with the provider's JSON response mode.
pub const JSON_ONLY_DIRECTIVE: &str = "Respond with a single valid JSON object and nothing else. \
Do not wrap it in markdown fences and do not add commentary.";

/// Build the multiple-choice quiz prompt.
///
/// `num_questions` is interpolated as-is; zero, negative or huge values are
/// not clamped.
pub fn quiz_prompt(text: &str, num_questions: impl fmt::Display) -> String {
    format!(
        r#"
    Based on the following text, generate a {num_questions}-question multiple-choice quiz.
    Provide the output as a JSON object in the following exact format:

    {{
      "questions": [
        {{
          "question": "The question text",
          "options": ["Option A", "Option B", "Option C", "Option D"],
          "answer": "The correct option text",
          "difficulty": "Easy"
        }}
      ]
    }}

    Rules:
    - Difficulty must be "Easy", "Medium", or "Hard".
    - The 'answer' must be one of the strings from the 'options' list.
    - Ensure the JSON is perfectly formatted.

    Here is the text:
    ---
    {text}
    ---
    "#
    )
}

/// Build the short-recap prompt.
pub fn recap_prompt(text: &str) -> String {
    format!(
        r#"
    Based on the following text, please provide a "short recap".
    This recap should:
    1. Summarize the main topics.
    2. Explain the key concepts in a few sentences each.

    Provide the output as a single JSON object in the following exact format:

    {{
      "recap": "Your summary text here, using paragraphs as needed."
    }}

    Here is the text:
    ---
    {text}
    ---
    "#
    )
}
