//! Generation: send a prompt to the remote model and relay its answer.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`]; this file only moves strings over the network.
//!
//! ## Relay contract
//!
//! A successful answer is returned byte-for-byte. Nothing here parses,
//! validates, or re-serialises it. Any failure is logged and replaced with
//! the capability's fixed error body by [`generate_or_error`], so the HTTP
//! handler always gets a string back and always answers 200 for this class
//! of failure. Callers must look for an `error` key in the body.
//!
//! ## Backends
//!
//! Every provider, Gemini included, goes through an `edgequake_llm`
//! [`LLMProvider`] wrapped in [`ProviderGenerator`], with
//! [`CompletionOptions::json_mode`] so the provider asks for a bare JSON
//! object (`responseMimeType` on Gemini, `response_format` on OpenAI-style
//! APIs). [`GeminiGenerator`] talks to the `generateContent` REST endpoint
//! directly and is used only when an API base URL is configured, because
//! `GeminiProvider` always targets Google's public endpoint.
//!
//! There are no retries.

use crate::config::{ProviderKind, ServerConfig};
use crate::error::{GenerationError, PdfQuizError};
use crate::prompts::JSON_ONLY_DIRECTIVE;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, GeminiProvider, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the caller is asking the model to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Quiz,
    Recap,
}

impl Capability {
    /// Body relayed to the client when generation fails.
    pub fn failure_body(self) -> &'static str {
        match self {
            Capability::Quiz => r#"{ "error": "Failed to generate quiz from AI" }"#,
            Capability::Recap => r#"{ "error": "Failed to generate recap from AI" }"#,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Quiz => f.write_str("quiz"),
            Capability::Recap => f.write_str("recap"),
        }
    }
}

/// A remote text-generation backend.
///
/// Shared by every request as `Arc<dyn Generator>`; substitute a stub in
/// tests.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Ask for a JSON answer to `prompt` and return the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Run `generator` and fold any failure into the capability's error body.
pub async fn generate_or_error(
    generator: &dyn Generator,
    capability: Capability,
    prompt: &str,
) -> String {
    let start = Instant::now();
    match generator.generate(prompt).await {
        Ok(text) => {
            debug!(
                "{} generated by {} in {:?}: {}",
                capability,
                generator.model(),
                start.elapsed(),
                text
            );
            text
        }
        Err(e) => {
            warn!("Error calling generation API for {}: {}", capability, e);
            capability.failure_body().to_string()
        }
    }
}

/// Build the generator named by `config.provider`.
pub fn build_generator(config: &ServerConfig) -> Result<Arc<dyn Generator>, PdfQuizError> {
    let generator: Arc<dyn Generator> = match (&config.provider, &config.api_base_url) {
        (ProviderKind::Gemini, Some(_)) => Arc::new(GeminiGenerator::from_config(config)?),
        _ => Arc::new(ProviderGenerator::from_config(config)?),
    };
    info!(
        "Generation backend: {} ({})",
        config.provider.name(),
        generator.model()
    );
    Ok(generator)
}

// ── Gemini REST ──────────────────────────────────────────────────────────

/// Gemini REST client for a configurable base URL.
///
/// Calls `{base}/v1beta/models/{model}:generateContent` with
/// `responseMimeType: application/json` and the key in `x-goog-api-key`.
/// Used for gateways, regional proxies and local stand-ins that
/// `GeminiProvider` cannot be pointed at.
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, PdfQuizError> {
        let model = model.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PdfQuizError::Internal(format!("HTTP client: {e}")))?;

        let model_path = if model.starts_with("models/") {
            model.clone()
        } else {
            format!("models/{model}")
        };
        let endpoint = format!(
            "{}/v1beta/{}:generateContent",
            base_url.trim_end_matches('/'),
            model_path
        );

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            model,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, PdfQuizError> {
        let base_url = config.api_base_url.as_deref().ok_or_else(|| {
            PdfQuizError::InvalidConfig("Gemini REST client needs an API base URL".into())
        })?;
        Self::new(
            gemini_api_key(config)?,
            config.model.clone(),
            base_url,
            config.api_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateContentRequest::json(prompt);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::EmptyResponse(format!("undecodable body: {e}")))?;
        parsed.into_text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single user turn, JSON response mode.
    pub fn json(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `generateContent` response body; only the fields we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn into_text(self) -> Result<String, GenerationError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GenerationError::EmptyResponse(match block_reason {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "no candidates".to_string(),
            }));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerationError::EmptyResponse(format!(
                "finish reason {}",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

// ── edgequake-llm providers ──────────────────────────────────────────────

/// Generator backed by any `edgequake_llm` provider.
///
/// Requests use JSON mode, and [`JSON_ONLY_DIRECTIVE`] goes ahead of the
/// prompt as a system message for models that follow instructions more
/// readily than response-format flags.
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    timeout: Option<Duration>,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout: None,
        }
    }

    /// Fail a call that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Instantiate the provider named in `config`.
    ///
    /// Gemini is built from the configured credential. Other names go through
    /// the factory, which reads that provider's own key variable
    /// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, …).
    pub fn from_config(config: &ServerConfig) -> Result<Self, PdfQuizError> {
        let provider: Arc<dyn LLMProvider> = match &config.provider {
            ProviderKind::Gemini => Arc::new(
                GeminiProvider::new(gemini_api_key(config)?).with_model(config.model.clone()),
            ),
            ProviderKind::Named(name) => ProviderFactory::create_llm_provider(name, &config.model)
                .map_err(|e| PdfQuizError::ProviderNotConfigured {
                    provider: name.clone(),
                    hint: format!("{e}"),
                })?,
        };
        Ok(Self::new(provider, config.model.clone())
            .with_timeout(config.api_timeout_secs.map(Duration::from_secs)))
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let messages = vec![
            ChatMessage::system(JSON_ONLY_DIRECTIVE),
            ChatMessage::user(prompt),
        ];
        let options = CompletionOptions::json_mode();

        let call = self.provider.chat(&messages, Some(&options));
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
                GenerationError::Transport(format!("no response within {timeout:?}"))
            })?,
            None => call.await,
        };
        let response = result.map_err(|e| GenerationError::Provider(format!("{e}")))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn gemini_api_key(config: &ServerConfig) -> Result<String, PdfQuizError> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or(PdfQuizError::MissingCredential {
            var: crate::config::API_KEY_VAR,
        })
}
