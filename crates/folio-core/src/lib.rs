//! Domain layer for the GitFolio client.
//!
//! Holds the conversation log, the document state, the backend contract and
//! the configuration model. Nothing in here performs I/O on its own.

pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod preview;
pub mod transport;

// Re-export common error type
pub use error::{FolioError, Result};
