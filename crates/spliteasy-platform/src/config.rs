use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub state_path: PathBuf,
    pub http_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("SPLITEASY_API_URL").context("SPLITEASY_API_URL is required")?;
        Self::with_api_url(api_url)
    }

    /// Same as [`ClientConfig::from_env`] but with the base URL supplied by
    /// the caller; the remaining settings still come from the environment.
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        let api_url = normalize_base_url(&api_url.into())?;
        let state_path = state_path_from_env();
        let http_timeout = match std::env::var("SPLITEASY_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("SPLITEASY_HTTP_TIMEOUT_SECS is not a number: {raw}"))?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            api_url,
            state_path,
            http_timeout,
        })
    }
}

/// `SPLITEASY_STATE_PATH`, else `~/.spliteasy/state.json` (relative to the
/// working directory when `HOME` is unset).
pub fn state_path_from_env() -> PathBuf {
    if let Ok(path) = std::env::var("SPLITEASY_STATE_PATH") {
        return PathBuf::from(path);
    }
    let base = std::env::var("HOME").map(PathBuf::from).unwrap_or_default();
    base.join(".spliteasy").join("state.json")
}

pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        anyhow::bail!("API URL must start with http:// or https://, got {raw:?}");
    }
    Ok(trimmed.to_string())
}
