//! Configuration service implementation.
//!
//! Loads [`FolioConfig`] from `~/.config/folio/config.toml`, applies
//! environment overrides and validates the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use folio_core::config::FolioConfig;
use folio_core::{FolioError, Result};

use crate::paths::FolioPaths;

/// Overrides `backend.base_url`.
pub const ENV_BACKEND_URL: &str = "FOLIO_BACKEND_URL";
/// Overrides `backend.session_token`.
pub const ENV_SESSION_TOKEN: &str = "FOLIO_SESSION_TOKEN";

/// Configuration service that loads and caches the configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<FolioConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default config file location.
    pub fn new_default() -> Result<Self> {
        Ok(Self::with_path(FolioPaths::config_file()?))
    }

    /// Creates a service reading the given file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading it from file if not cached.
    pub fn get_config(&self) -> Result<FolioConfig> {
        {
            let cached = self
                .config
                .read()
                .map_err(|_| FolioError::internal("config cache lock poisoned"))?;
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load(|key| std::env::var(key).ok())?;

        let mut cached = self
            .config
            .write()
            .map_err(|_| FolioError::internal("config cache lock poisoned"))?;
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }

    /// Reads the file (defaults when absent or empty), applies overrides
    /// from `env` and validates.
    pub fn load(&self, env: impl Fn(&str) -> Option<String>) -> Result<FolioConfig> {
        let mut config = if self.path.exists() {
            let content = fs::read_to_string(&self.path).map_err(|e| {
                FolioError::io(format!(
                    "Failed to read configuration file at {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            if content.trim().is_empty() {
                FolioConfig::default()
            } else {
                toml::from_str(&content)?
            }
        } else {
            tracing::debug!(
                target: "folio::config",
                path = %self.path.display(),
                "No configuration file, using defaults"
            );
            FolioConfig::default()
        };

        apply_env_overrides(&mut config, env);
        config.validate()?;

        tracing::info!(
            target: "folio::config",
            backend = %config.backend.base_url,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Applies environment overrides. Blank values are ignored.
pub fn apply_env_overrides(config: &mut FolioConfig, env: impl Fn(&str) -> Option<String>) {
    let non_blank = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = non_blank(ENV_BACKEND_URL) {
        config.backend.base_url = url;
    }
    if let Some(token) = non_blank(ENV_SESSION_TOKEN) {
        config.backend.session_token = Some(token);
    }
}
