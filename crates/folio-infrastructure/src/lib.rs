//! Infrastructure for the GitFolio client: paths, configuration file,
//! attachment loading and the file-backed preview surface.

pub mod attachment;
pub mod config_service;
pub mod paths;
pub mod preview_file;

pub use crate::attachment::load_attachment;
pub use crate::config_service::ConfigService;
pub use crate::paths::{FolioPaths, PathError};
pub use crate::preview_file::FilePreviewSurface;
