//! Configuration model for the GitFolio client.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every section has
//! defaults, so an absent file or a partial file is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MIN_DELAY_MS: u64 = 20;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60;

/// Root configuration structure for config.toml
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FolioConfig {
    pub backend: BackendConfig,
    pub reveal: RevealConfig,
    pub preview: PreviewConfig,
}

/// Where the generation backend lives and how to talk to it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Opaque bearer token attached to every call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Opaque cookie header attached to every call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_token: None,
            cookie: None,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Pacing of the typing reveal.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RevealConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RevealConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Where the preview surface writes the document.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Output file; the data directory default is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl FolioConfig {
    /// Checks the values that have no sensible fallback.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.backend.base_url.trim();
        if base_url.is_empty() {
            return Err(FolioError::config("backend.base_url must not be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(FolioError::config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(FolioError::config("backend.timeout_secs must be positive"));
        }
        if self.reveal.min_delay_ms > self.reveal.max_delay_ms {
            return Err(FolioError::config(format!(
                "reveal.min_delay_ms ({}) exceeds reveal.max_delay_ms ({})",
                self.reveal.min_delay_ms, self.reveal.max_delay_ms
            )));
        }
        Ok(())
    }
}
