//! HttpPortfolioBackend - REST client for the portfolio generation backend.
//!
//! Every call carries the configured session credentials and is bounded by
//! the configured timeout. Failures are normalized into [`TransportError`]:
//!
//! - connect errors, timeouts and undecodable bodies → `NetworkFailure`
//! - HTTP 404 → `NotFound`
//! - other non-2xx, or a `{"error": ...}` payload → `ServerRejected`

use async_trait::async_trait;
use folio_core::config::BackendConfig;
use folio_core::conversation::Message;
use folio_core::transport::{
    ChatReply, GeneratedDocument, PortfolioBackend, TransportError, TransportResult, UploadFile,
};
use folio_core::{FolioError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::wire::{
    ChatHistoryRequest, ChatHistoryResponse, ChatRequest, ChatResponse, DocumentResponse,
    ErrorBody, RESUME_FIELD,
};

const GENERATE_PATH: &str = "/generate_portfolio";
const CHAT_PATH: &str = "/chat_portfolio";
const DOCUMENT_PATH: &str = "/portfolio";
const HISTORY_PATH: &str = "/chat_history";

/// Opaque credentials supplied by configuration.
#[derive(Clone, Default)]
struct Credentials {
    session_token: Option<String>,
    cookie: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secrets themselves.
        f.debug_struct("Credentials")
            .field("session_token", &self.session_token.is_some())
            .field("cookie", &self.cookie.is_some())
            .finish()
    }
}

/// Backend client that talks HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpPortfolioBackend {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpPortfolioBackend {
    /// Creates a client from the backend section of the configuration.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FolioError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a backend around an existing client.
    pub fn with_client(client: Client, config: &BackendConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Credentials {
                session_token: config.session_token.clone(),
                cookie: config.cookie.clone(),
            },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.credentials.session_token {
            request = request.bearer_auth(token);
        }
        if let Some(cookie) = &self.credentials.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        request
    }

    async fn send(&self, request: RequestBuilder, operation: &'static str) -> TransportResult<Response> {
        tracing::debug!(target: "folio::transport", operation, "Sending request");
        self.authorize(request).send().await.map_err(|e| {
            tracing::warn!(target: "folio::transport", operation, error = %e, "Request failed");
            map_request_error(e)
        })
    }
}

#[async_trait]
impl PortfolioBackend for HttpPortfolioBackend {
    async fn upload_and_generate(&self, file: &UploadFile) -> TransportResult<GeneratedDocument> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| TransportError::rejected(format!("Invalid file type '{}': {}", file.mime_type, e)))?;
        let form = Form::new().part(RESUME_FIELD, part);

        tracing::info!(
            target: "folio::transport",
            file_name = %file.file_name,
            size = file.size(),
            "Uploading resume for generation"
        );
        let response = self
            .send(self.client.post(self.url(GENERATE_PATH)).multipart(form), "upload_and_generate")
            .await?;
        read_json::<DocumentResponse>(response).await?.into_document()
    }

    async fn send_chat_message(&self, text: &str) -> TransportResult<ChatReply> {
        let request = self
            .client
            .post(self.url(CHAT_PATH))
            .json(&ChatRequest { message: text });
        let response = self.send(request, "send_chat_message").await?;
        let reply: ChatReply = read_json::<ChatResponse>(response).await?.into();
        tracing::debug!(
            target: "folio::transport",
            inline_html = reply.html.is_some(),
            document_updated = reply.document_updated,
            "Chat reply received"
        );
        Ok(reply)
    }

    async fn fetch_document(&self) -> TransportResult<GeneratedDocument> {
        let response = self
            .send(self.client.get(self.url(DOCUMENT_PATH)), "fetch_document")
            .await?;
        read_json::<DocumentResponse>(response).await?.into_document()
    }

    async fn fetch_conversation(&self) -> TransportResult<Vec<Message>> {
        let response = self
            .send(self.client.get(self.url(HISTORY_PATH)), "fetch_conversation")
            .await?;
        Ok(read_json::<ChatHistoryResponse>(response).await?.chat_history)
    }

    async fn save_conversation(&self, messages: &[Message]) -> TransportResult<()> {
        let request = self
            .client
            .post(self.url(HISTORY_PATH))
            .json(&ChatHistoryRequest {
                chat_history: messages,
            });
        let response = self.send(request, "save_conversation").await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }
}

/// Decodes a 2xx body as `T`, or classifies the failure.
async fn read_json<T: DeserializeOwned>(response: Response) -> TransportResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| TransportError::network(format!("Failed to decode response: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

/// Maps a non-2xx status and its body to a transport error.
pub fn classify_failure(status: StatusCode, body: &str) -> TransportError {
    if status == StatusCode::NOT_FOUND {
        return TransportError::NotFound;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if !error.trim().is_empty() => TransportError::rejected(error),
        _ => TransportError::rejected(format!("HTTP {}", status)),
    }
}

fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::network(format!("Request timed out: {}", err))
    } else if err.is_connect() {
        TransportError::network(format!("Could not connect: {}", err))
    } else {
        TransportError::network(err.to_string())
    }
}
