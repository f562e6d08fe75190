// Backend location and upload tuning shared by every command.

use anyhow::{Context, Result};
use reqwest::Url;

use crate::upload::{RetryPolicy, DEFAULT_CHUNK_SIZE};

pub const ENDPOINT_ENV: &str = "PORTAL_BACKEND_ENDPOINT";
pub const DEFAULT_ENDPOINT: &str = "https://api.innoactive.io";

/// Resolved settings for one CLI invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Url,
    pub chunk_size: usize,
    pub retry: RetryPolicy,
    /// Suppress progress bars.
    pub quiet: bool,
}

impl Settings {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid backend endpoint {endpoint:?}"))?;
        Ok(Settings {
            endpoint,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
            quiet: false,
        })
    }

    /// Resolve an absolute API path (e.g. `/api/applications/`) against the
    /// endpoint. Any path already on the endpoint is replaced.
    pub fn api_url(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path)
            .with_context(|| format!("Invalid API path {path:?}"))
    }
}
