use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub file_storage_dir: String,
    pub llm_tracing: LlmTracingConfig,
}

/// Optional model-call tracing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmTracingConfig {
    pub enabled: bool,
    pub project: String,
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            debug: parse_flag(lookup("DEBUG")),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            openai_api_key: lookup("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: lookup("OPENAI_BASE_URL").filter(|v| !v.is_empty()),
            file_storage_dir: lookup("FILE_STORAGE_DIR")
                .unwrap_or_else(|| "./storage/feedback_raw".to_string()),
            llm_tracing: LlmTracingConfig {
                enabled: parse_flag(lookup("LLM_TRACING_ENABLED")),
                project: lookup("LLM_TRACING_PROJECT")
                    .unwrap_or_else(|| "feedback-analytics".to_string()),
                api_key: lookup("LLM_TRACING_API_KEY").filter(|v| !v.is_empty()),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default log filter for this configuration.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "info,server_core=debug,feedback_pipeline=debug,sqlx=warn"
        } else {
            "info,sqlx=warn"
        }
    }
}

fn parse_flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("true" | "1" | "t")
    )
}
