//! Server binary for edgequake-pdfquiz.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServerConfig` and runs the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfquiz::config::{API_KEY_VAR, DEFAULT_MODEL};
use edgequake_pdfquiz::{server, LopdfExtractor, ProviderKind, ServerConfig, TextExtractor};
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on 127.0.0.1:5000 with the key from .env
  pdfquiz

  # Listen on all interfaces
  pdfquiz --host 0.0.0.0 --port 8080

  # Use another provider through edgequake-llm
  pdfquiz --provider openai --model gpt-4.1-mini

  # Print the text the server would send for a PDF (no API key needed)
  pdfquiz --extract-only notes.pdf

  # Generate a quiz
  curl -F file=@notes.pdf -F num_questions=3 http://127.0.0.1:5000/upload

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY             Gemini API key (required for the gemini provider)
  PDFQUIZ_PROVIDER           gemini (default), openai, anthropic, ollama, …
  PDFQUIZ_MODEL              Model ID (default gemini-2.5-flash)
  PORT                       Listen port
  RUST_LOG                   tracing filter, overrides -v / -q

A .env file in the working directory is loaded at startup.
"#;

/// Serve PDF-to-quiz and PDF-to-recap endpoints backed by an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdfquiz",
    version,
    about = "HTTP backend that turns uploaded PDFs into quizzes and recaps",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Gemini API key.
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,

    /// Generation provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "PDFQUIZ_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model ID.
    #[arg(long, env = "PDFQUIZ_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Address to listen on.
    #[arg(long, env = "PDFQUIZ_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Send Gemini requests to this base URL instead of Google's endpoint
    /// (gateway or proxy speaking the `generateContent` REST API).
    #[arg(long, env = "GEMINI_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Generation call timeout in seconds (default: none).
    #[arg(long, env = "PDFQUIZ_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Reject request bodies larger than this many MiB (default: no limit).
    #[arg(long, env = "PDFQUIZ_MAX_UPLOAD_MB")]
    max_upload_mb: Option<usize>,

    /// Question count when `num_questions` is missing or not an integer.
    #[arg(
        long,
        env = "PDFQUIZ_DEFAULT_QUESTIONS",
        default_value_t = 5,
        allow_negative_numbers = true
    )]
    default_questions: i64,

    /// Do not log schema findings for generated output.
    #[arg(long)]
    no_inspect: bool,

    /// Print the extracted text of a local PDF and exit.
    #[arg(long, value_name = "PDF")]
    extract_only: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs (includes raw model output).
    #[arg(short, long, env = "PDFQUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFQUIZ_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Extract-only mode ────────────────────────────────────────────────
    if let Some(ref path) = cli.extract_only {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let pages = LopdfExtractor
            .page_texts(&bytes)
            .with_context(|| format!("Error processing PDF {}", path.display()))?;
        let text = edgequake_pdfquiz::join_pages(&pages);

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    // ── Build config (fails fast without a credential) ───────────────────
    let config = build_config(&cli)?;
    tracing::debug!("{:?}", config);

    server::serve(&config).await.context("Server failed")?;
    Ok(())
}

/// Map CLI args to `ServerConfig`.
fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .host(cli.host)
        .port(cli.port)
        .provider(ProviderKind::parse(&cli.provider))
        .model(cli.model.clone())
        .api_base_url(cli.api_base_url.clone())
        .api_timeout_secs(cli.api_timeout)
        .max_upload_bytes(cli.max_upload_mb.map(|mb| mb.saturating_mul(1024 * 1024)))
        .default_questions(cli.default_questions)
        .inspect_responses(!cli.no_inspect);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }

    builder.build().context("Invalid configuration")
}
