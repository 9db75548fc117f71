//! Text extraction: PDF bytes → one text blob, pages in document order.
//!
//! ## Why spawn_blocking?
//!
//! Parsing a PDF and decoding its content streams is CPU-bound and can take
//! a noticeable amount of time on large documents. Running it on the
//! blocking pool keeps the Tokio worker threads free for other requests.
//!
//! ## Joining rule
//!
//! Every page contributes its text followed by exactly one `\n`, including
//! pages with no extractable text. A two-page document whose second page is
//! blank therefore yields `"<page 1>\n\n"`.

use crate::error::PdfQuizError;
use axum::body::Bytes;
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, info};

/// Produces per-page text from an in-memory PDF.
///
/// Implementations must be `Send + Sync`: a single extractor is shared by
/// every request.
pub trait TextExtractor: Send + Sync {
    /// Text of each page, in document order. An empty string marks a page
    /// with no extractable text.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, PdfQuizError>;
}

/// [`TextExtractor`] backed by `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, PdfQuizError> {
        let document = Document::load_mem(pdf).map_err(|e| PdfQuizError::CorruptPdf {
            detail: e.to_string(),
        })?;

        // BTreeMap keyed by 1-based page number: iteration is document order.
        let pages = document.get_pages();
        info!("PDF loaded: {} pages", pages.len());

        let mut texts = Vec::with_capacity(pages.len());
        for &page_num in pages.keys() {
            let text = match document.extract_text(&[page_num]) {
                // lopdf terminates each text object with a line break; the
                // joining rule adds its own.
                Ok(t) => t.trim_end_matches(['\r', '\n']).to_string(),
                Err(e) => {
                    debug!("Page {}: no extractable text ({})", page_num, e);
                    String::new()
                }
            };
            texts.push(text);
        }

        Ok(texts)
    }
}

/// Concatenate page texts, appending `\n` after every page.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let capacity = pages.iter().map(|p| p.as_ref().len() + 1).sum();
    let mut full_text = String::with_capacity(capacity);
    for page in pages {
        full_text.push_str(page.as_ref());
        full_text.push('\n');
    }
    full_text
}

/// Extract the full text of `pdf` off the async executor.
pub async fn extract_text(
    extractor: Arc<dyn TextExtractor>,
    pdf: Bytes,
) -> Result<String, PdfQuizError> {
    let pages = tokio::task::spawn_blocking(move || extractor.page_texts(&pdf))
        .await
        .map_err(|e| PdfQuizError::Internal(format!("Extraction task panicked: {e}")))??;

    let text = join_pages(&pages);
    debug!("Extracted {} chars from {} pages", text.len(), pages.len());
    Ok(text)
}
