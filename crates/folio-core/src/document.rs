//! The latest generated portfolio document.

use serde::{Deserialize, Serialize};

/// State of the generated document shown in the preview surface.
///
/// Only the orchestrator transitions this record. While `generating` is set,
/// `present` and `content` keep their previous values; they change only when
/// an update is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    pub content: Option<String>,
    pub present: bool,
    pub generating: bool,
    pub last_error: Option<String>,
}

impl DocumentState {
    /// The initial state: nothing generated yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Marks a generation as started.
    pub fn begin_generation(&mut self) {
        self.generating = true;
    }

    /// Installs freshly generated markup.
    pub fn apply_update(&mut self, html: String) {
        self.content = Some(html);
        self.present = true;
        self.generating = false;
        self.last_error = None;
    }

    /// Records a failed generation or refresh. The held content is kept.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.generating = false;
        self.last_error = Some(message.into());
    }

    /// Ends a generation that was abandoned without a result.
    pub fn abandon_generation(&mut self) {
        self.generating = false;
    }

    pub fn html(&self) -> Option<&str> {
        self.content.as_deref()
    }
}
