use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables (and an
/// optional `.env` file). Everything has a sensible default except the API
/// key, which is only needed by the AI commands and checked there.
#[derive(Debug, Clone)]
pub struct Config {
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub compiler: String,
    pub openrouter_api_key: Option<String>,
    pub debounce: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let debounce_ms = std::env::var("PREVIEW_DEBOUNCE_MS")
            .unwrap_or_else(|_| "1500".to_string())
            .parse::<u64>()
            .context("PREVIEW_DEBOUNCE_MS must be a number of milliseconds")?;

        Ok(Config {
            templates_dir: env_or("TEMPLATES_DIR", "templates").into(),
            output_dir: env_or("OUTPUT_DIR", "output").into(),
            compiler: env_or("LATEX_COMPILER", "pdflatex"),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok().filter(|k| !k.is_empty()),
            debounce: Duration::from_millis(debounce_ms),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// The API key, or a descriptive error for commands that need it.
    pub fn require_api_key(&self) -> Result<&str> {
        self.openrouter_api_key
            .as_deref()
            .context("OPENROUTER_API_KEY is not set; AI commands need it")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
