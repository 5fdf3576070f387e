//! Contract with the portfolio generation backend.
//!
//! The backend parses uploaded resumes, talks to the language model and
//! renders the portfolio. The client only sees the five calls below, each
//! normalized into `Ok(payload)` or a [`TransportError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::Message;

/// Failure taxonomy shared by every backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    /// No usable response: connection refused, timeout, undecodable body.
    #[error("Network failure: {message}")]
    NetworkFailure { message: String },

    /// The backend answered with a structured error or a non-2xx status.
    #[error("Server rejected the request: {message}")]
    ServerRejected { message: String },

    /// The requested resource does not exist yet (HTTP 404).
    #[error("Not found")]
    NotFound,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ServerRejected {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// A type alias for results of backend calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// A file selected by the user to seed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, sent as the multipart file name.
    pub file_name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A generated document as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub html: String,
}

/// The backend's answer to a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatReply {
    /// Conversational text to reveal to the user.
    pub response_text: String,
    /// Updated document markup, when the backend embeds it.
    pub html: Option<String>,
    /// The backend changed the document during this turn.
    pub document_updated: bool,
    /// Whether the backend holds a document at all, when reported.
    pub has_document: Option<bool>,
}

/// How a chat reply asks the client to bring its document up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRefresh {
    /// The reply carried the new markup.
    Inline(String),
    /// The document changed but must be fetched separately.
    Fetch,
    /// Nothing to do.
    Unchanged,
}

impl ChatReply {
    /// Decides which update path applies. Embedded markup wins over a bare
    /// `document_updated` flag.
    pub fn document_refresh(&self) -> DocumentRefresh {
        match (&self.html, self.document_updated) {
            (Some(html), _) => DocumentRefresh::Inline(html.clone()),
            (None, true) => DocumentRefresh::Fetch,
            (None, false) => DocumentRefresh::Unchanged,
        }
    }
}

/// An abstract client for the portfolio generation backend.
///
/// Implementations attach the session credentials they were configured with
/// to every call and enforce a bounded timeout, reporting it as
/// [`TransportError::NetworkFailure`]. Nothing is retried automatically.
#[async_trait]
pub trait PortfolioBackend: Send + Sync {
    /// Uploads a resume and asks the backend to generate a portfolio from it.
    async fn upload_and_generate(&self, file: &UploadFile) -> TransportResult<GeneratedDocument>;

    /// Sends one chat turn.
    async fn send_chat_message(&self, text: &str) -> TransportResult<ChatReply>;

    /// Fetches the current document.
    ///
    /// Returns `Err(TransportError::NotFound)` when nothing was generated yet.
    async fn fetch_document(&self) -> TransportResult<GeneratedDocument>;

    /// Fetches the stored conversation.
    async fn fetch_conversation(&self) -> TransportResult<Vec<Message>>;

    /// Stores the conversation. Best-effort: callers log failures and move on.
    async fn save_conversation(&self, messages: &[Message]) -> TransportResult<()>;
}
