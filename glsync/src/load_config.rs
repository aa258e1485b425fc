/// `load_config` module: turns an optional YAML file, command-line overrides and
/// environment secrets into a [`SyncConfig`].
///
/// The YAML file never holds secrets. The session cookie comes from
/// `LEETCODE_SESSION` and the optional bearer token from `LEETCODE_BEARER_TOKEN`
/// (both may be supplied through a `.env` file).
///
/// # Errors
/// Every failure is an `anyhow::Error` naming the offending file, variable or
/// value, surfaced at the CLI boundary before any network or git work starts.
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use glsync_core::leetcode::{RetryPolicy, DEFAULT_ENDPOINT};
use glsync_core::SyncConfig;
use glsync_core::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const SESSION_ENV: &str = "LEETCODE_SESSION";
pub const BEARER_TOKEN_ENV: &str = "LEETCODE_BEARER_TOKEN";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub repo_url: Option<String>,
    pub endpoint: Option<String>,
    pub workdir: Option<PathBuf>,
    pub retry: Option<RetrySection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub backoff_ms: Option<u64>,
}

pub fn read_file_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let parsed: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow!("Failed to parse config YAML {:?}: {e}", path_ref)
    })?;
    info!(config_path = ?path_ref, "Parsed config YAML successfully");
    Ok(parsed)
}

/// A LeetCode session cookie is a JWT: at least three dot-separated parts,
/// the second of which is unpadded base64 decoding to JSON.
pub fn is_valid_session_cookie(cookie: &str) -> bool {
    let parts: Vec<&str> = cookie.trim().split('.').collect();
    if parts.len() < 3 {
        return false;
    }
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload));
    match decoded {
        Ok(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes).is_ok(),
        Err(_) => false,
    }
}

/// Merges the optional config file, the `--repo-url` override and the
/// environment secrets into a validated [`SyncConfig`].
pub fn load_config(config_path: Option<&Path>, repo_url_override: Option<String>) -> Result<SyncConfig> {
    let file = match config_path {
        Some(path) => read_file_config(path)?,
        None => FileConfig::default(),
    };

    let repo_url = repo_url_override
        .or(file.repo_url)
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            error!("No repository url configured");
            anyhow!("No git repository url provided; set `repo_url` in the config file or pass --repo-url")
        })?;

    let endpoint_raw = file.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let endpoint = Url::parse(&endpoint_raw)
        .with_context(|| format!("Invalid endpoint url: {endpoint_raw}"))?;

    let defaults = RetryPolicy::default();
    let retry = match file.retry {
        Some(section) => RetryPolicy {
            max_retries: section.max_retries.unwrap_or(defaults.max_retries),
            backoff: section
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
        },
        None => defaults,
    };

    let session_cookie = std::env::var(SESSION_ENV).map_err(|e| {
        error!(error = ?e, "{SESSION_ENV} environment variable not set");
        anyhow!("{SESSION_ENV} environment variable not set: {e}")
    })?;
    if !is_valid_session_cookie(&session_cookie) {
        error!("{SESSION_ENV} is not a valid session cookie");
        bail!("Invalid LeetCode session cookie in {SESSION_ENV}: expected a JWT, see README for how to copy it from the browser");
    }

    let bearer_token = std::env::var(BEARER_TOKEN_ENV)
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    let config = SyncConfig {
        repo_url,
        endpoint,
        workdir: file.workdir.unwrap_or_else(|| PathBuf::from(".")),
        retry,
        session_cookie: session_cookie.trim().to_string(),
        bearer_token,
    };
    config.trace_loaded();
    Ok(config)
}
