//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::http::HttpApi;
use crate::retry::RetryPolicy;
use crate::trait_::Result;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "PLANBOARD_API_URL";
/// Environment variable overriding [`ClientConfig::token`].
pub const ENV_TOKEN: &str = "PLANBOARD_TOKEN";

/// Connection settings for the planning backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `https://plans.example.org/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Token for the `Authorization` header
    #[serde(default)]
    pub token: Option<String>,

    /// Extra attempts for failed reads
    #[serde(default = "default_read_retries")]
    pub read_retries: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_read_retries() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            read_retries: default_read_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Overlay `PLANBOARD_API_URL` and `PLANBOARD_TOKEN` when set.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
        self
    }

    /// Retry policy for reads.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.read_retries,
            ..RetryPolicy::default()
        }
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build an HTTP client from these settings.
    pub fn connect(&self) -> Result<HttpApi> {
        HttpApi::new(self)
    }
}
