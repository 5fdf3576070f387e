//! Loading user-selected files for upload.

use std::path::Path;

use folio_core::transport::UploadFile;
use folio_core::{FolioError, Result};

/// Extensions the generation backend can parse.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "docx"];

/// Reads a resume from disk and prepares it for upload.
///
/// Files the backend cannot parse are refused here, before anything is
/// submitted.
pub async fn load_attachment(path: &Path) -> Result<UploadFile> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FolioError::io(format!("Not a file path: {}", path.display())))?
        .to_string();

    if !is_supported(path) {
        return Err(FolioError::config(format!(
            "Unsupported file type '{}' (supported: {})",
            file_name,
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        FolioError::io(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    tracing::debug!(
        target: "folio::attachment",
        file_name = %file_name,
        mime_type = %mime_type,
        size = bytes.len(),
        "Attachment loaded"
    );
    Ok(UploadFile::new(file_name, mime_type, bytes))
}

/// Whether the file extension is one the backend accepts.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
