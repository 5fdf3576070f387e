//! Unified path management for GitFolio files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/folio/             # Config directory
//! └── config.toml              # Application configuration
//!
//! ~/.local/share/folio/        # Data directory
//! ├── preview/
//! │   └── portfolio.html       # Latest generated document
//! └── logs/                    # Application logs
//!     └── folio.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "folio";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for folio_core::FolioError {
    fn from(err: PathError) -> Self {
        folio_core::FolioError::config(err.to_string())
    }
}

/// Platform-appropriate locations (XDG on Linux, native elsewhere).
pub struct FolioPaths;

impl FolioPaths {
    /// Returns the configuration directory (e.g., `~/.config/folio/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g., `~/.local/share/folio/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("logs"))
    }

    /// Returns the default preview file location.
    pub fn default_preview_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("preview").join("portfolio.html"))
    }
}
