use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use tracing::{debug, info};

use crate::leetcode::RetryPolicy;

/// Fully resolved settings for one run, secrets included.
#[derive(Clone)]
pub struct SyncConfig {
    /// Repository the submissions are committed to; must already exist.
    pub repo_url: String,
    /// GraphQL endpoint of the judge.
    pub endpoint: Url,
    /// Directory the working copy is cloned into.
    pub workdir: PathBuf,
    pub retry: RetryPolicy,
    /// Value of the `LEETCODE_SESSION` cookie.
    pub session_cookie: String,
    pub bearer_token: Option<String>,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            repo_url = %self.repo_url,
            endpoint = %self.endpoint,
            workdir = %self.workdir.display(),
            max_retries = self.retry.max_retries,
            backoff_ms = self.retry.backoff.as_millis() as u64,
            bearer_token_set = self.bearer_token.is_some(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("repo_url", &self.repo_url)
            .field("endpoint", &self.endpoint.as_str())
            .field("workdir", &self.workdir)
            .field("retry", &self.retry)
            .field("session_cookie", &"<redacted>")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
