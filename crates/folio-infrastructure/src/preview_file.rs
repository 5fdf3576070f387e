//! File-backed preview surface.
//!
//! Writes the latest document to an HTML file so any browser pointed at it
//! shows the current portfolio. Writes are atomic: content goes to a
//! temporary file in the same directory, is synced, then renamed over the
//! target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use folio_core::document::DocumentState;
use folio_core::preview::PreviewSurface;
use folio_core::Result;
use tokio::io::AsyncWriteExt;

const EMPTY_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Portfolio Preview</title></head>
<body>
<h3>No Preview Available Yet</h3>
<p>Start chatting with GitFolio to generate your portfolio code preview.</p>
<p>Simply describe what you're looking for, and we'll create customized code for you.</p>
</body>
</html>
"#;

const GENERATING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta http-equiv="refresh" content="2"><title>Portfolio Preview</title></head>
<body>
<h3>Generating your portfolio...</h3>
</body>
</html>
"#;

/// Preview surface writing HTML to a file.
#[derive(Debug, Clone)]
pub struct FilePreviewSurface {
    path: PathBuf,
}

impl FilePreviewSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "preview.html".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomic(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.temp_path();
        let mut tmp_file = tokio::fs::File::create(&tmp_path).await?;
        tmp_file.write_all(content.as_bytes()).await?;
        tmp_file.sync_all().await?;
        drop(tmp_file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// Picks the page for a document state.
///
/// A held document stays visible while a new one is generating.
pub fn page_for(document: &DocumentState) -> &str {
    match document.html() {
        Some(html) => html,
        None if document.generating => GENERATING_PAGE,
        None => EMPTY_PAGE,
    }
}

#[async_trait]
impl PreviewSurface for FilePreviewSurface {
    async fn render(&self, document: &DocumentState) -> Result<()> {
        self.write_atomic(page_for(document)).await?;
        tracing::debug!(
            target: "folio::preview",
            path = %self.path.display(),
            present = document.present,
            generating = document.generating,
            "Preview updated"
        );
        Ok(())
    }
}
