//! Server configuration.
//!
//! Everything the process reads at startup lives in [`ServerConfig`], built
//! via [`ServerConfigBuilder`]. The value is read-only once the server is
//! running; handlers only ever see the [`crate::server::AppState`] derived
//! from it.

use crate::error::PdfQuizError;
use crate::prompts::DEFAULT_NUM_QUESTIONS;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Environment variable holding the Gemini credential.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Which generation backend serves requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Google Gemini with JSON response mode. (default)
    #[default]
    Gemini,
    /// Any provider name accepted by `edgequake_llm::ProviderFactory`.
    Named(String),
}

impl ProviderKind {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "gemini" | "google" => ProviderKind::Gemini,
            other => ProviderKind::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Named(n) => n,
        }
    }
}

/// Configuration for the quiz/recap server.
///
/// Built via [`ServerConfig::builder()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfquiz::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .api_key("test-key")
///     .port(8080)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-flash");
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on. Default: 127.0.0.1.
    pub host: IpAddr,

    /// Port to listen on. Default: 5000.
    pub port: u16,

    /// Generation backend. Default: [`ProviderKind::Gemini`].
    pub provider: ProviderKind,

    /// Model identifier. Default: `gemini-2.5-flash`.
    pub model: String,

    /// Gemini credential. Required when `provider` is Gemini.
    pub api_key: Option<String>,

    /// Base URL of a Gemini-compatible REST API (gateway, proxy).
    ///
    /// `None` uses edgequake-llm's `GeminiProvider` against Google's public
    /// endpoint. Only valid with the Gemini provider.
    pub api_base_url: Option<String>,

    /// Per-call timeout for the generation request, in seconds.
    ///
    /// `None` leaves the HTTP client's default in place (no timeout).
    pub api_timeout_secs: Option<u64>,

    /// Maximum accepted request body in bytes. `None` disables the limit.
    pub max_upload_bytes: Option<usize>,

    /// Question count used when `num_questions` is absent or not an integer.
    pub default_questions: i64,

    /// Log findings when a generated quiz or recap does not match its schema.
    /// The relayed body is never touched. Default: true.
    pub inspect_responses: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            provider: ProviderKind::default(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base_url: None,
            api_timeout_secs: None,
            max_upload_bytes: None,
            default_questions: DEFAULT_NUM_QUESTIONS,
            inspect_responses: true,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("default_questions", &self.default_questions)
            .field("inspect_responses", &self.inspect_responses)
            .finish()
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn provider(mut self, provider: ProviderKind) -> Self {
        self.config.provider = provider;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: Option<String>) -> Self {
        self.config.api_base_url = url;
        self
    }

    pub fn api_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: Option<usize>) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn default_questions(mut self, n: i64) -> Self {
        self.config.default_questions = n;
        self
    }

    pub fn inspect_responses(mut self, v: bool) -> Self {
        self.config.inspect_responses = v;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A Gemini provider without a non-empty credential is rejected here so
    /// the process never starts serving half-configured.
    pub fn build(self) -> Result<ServerConfig, PdfQuizError> {
        let c = &self.config;
        if c.provider == ProviderKind::Gemini
            && c.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(PdfQuizError::MissingCredential { var: API_KEY_VAR });
        }
        if c.model.trim().is_empty() {
            return Err(PdfQuizError::InvalidConfig("model must not be empty".into()));
        }
        if let Some(url) = &c.api_base_url {
            if c.provider != ProviderKind::Gemini {
                return Err(PdfQuizError::InvalidConfig(format!(
                    "an API base URL only applies to the gemini provider, not '{}'",
                    c.provider.name()
                )));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PdfQuizError::InvalidConfig(format!(
                    "API base URL must be http(s), got '{url}'"
                )));
            }
        }
        if c.api_timeout_secs == Some(0) {
            return Err(PdfQuizError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
