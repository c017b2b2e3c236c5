use anyhow::{anyhow, Context, Result};
use clap::Args;
use reqwest::Url;
use std::time::Duration;

use crate::ai::DEFAULT_GEMINI_MODEL;

pub const DEFAULT_API_URL: &str =
    "https://job-tracker-fullstack-3m2s.onrender.com/api/applications";

/// Connection settings shared by every command. Each flag falls back to an
/// environment variable, which may come from a `.env` file.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Base URL of the applications API
    #[arg(long, global = true, env = "HUNT_API_BASE_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "HUNT_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Gemini model used for job description analysis
    #[arg(long, global = true, env = "HUNT_GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub model: String,

    /// Gemini API key; analysis is disabled without one
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Log filter, e.g. "info" or "hunt_board=debug"
    #[arg(long, global = true, env = "HUNT_LOG", default_value = "info")]
    pub log_level: String,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub timeout: Duration,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub log_level: String,
}

impl Config {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.timeout_secs == 0 {
            return Err(anyhow!("Timeout must be at least one second"));
        }
        let gemini_api_key = settings
            .gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Ok(Self {
            api_url: parse_api_url(&settings.api_url)?,
            timeout: Duration::from_secs(settings.timeout_secs),
            gemini_api_key,
            gemini_model: settings.model.trim().to_string(),
            log_level: settings.log_level.clone(),
        })
    }
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).with_context(|| format!("Invalid API URL: {}", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!("API URL must be http or https, got '{}'", other)),
    }
}
