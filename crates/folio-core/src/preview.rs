//! Preview surface trait.
//!
//! Defines the interface of whatever displays the latest generated document.

use async_trait::async_trait;

use crate::document::DocumentState;
use crate::error::Result;

/// A surface that displays the current document.
///
/// The orchestrator pushes every [`DocumentState`] change to the surface.
/// Implementations must render the empty and generating states as well, so
/// the surface never shows a document the client no longer holds.
#[async_trait]
pub trait PreviewSurface: Send + Sync {
    /// Renders the given state, replacing whatever was shown before.
    async fn render(&self, document: &DocumentState) -> Result<()>;
}
