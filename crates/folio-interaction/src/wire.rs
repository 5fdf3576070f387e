//! Wire-level request and response bodies of the generation backend.

use folio_core::conversation::Message;
use folio_core::transport::{ChatReply, GeneratedDocument, TransportError, TransportResult};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the uploaded resume.
pub const RESUME_FIELD: &str = "resume_file";

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Body returned by the generate and fetch-document endpoints.
#[derive(Debug, Deserialize)]
pub struct DocumentResponse {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DocumentResponse {
    pub fn into_document(self) -> TransportResult<GeneratedDocument> {
        match (self.html, self.error) {
            (_, Some(error)) => Err(TransportError::rejected(error)),
            (Some(html), None) => Ok(GeneratedDocument { html }),
            (None, None) => Err(TransportError::rejected(
                "response did not include a document",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub portfolio_updated: Option<bool>,
    #[serde(default)]
    pub has_portfolio: Option<bool>,
}

impl From<ChatResponse> for ChatReply {
    fn from(response: ChatResponse) -> Self {
        Self {
            response_text: response.response,
            html: response.html.filter(|html| !html.trim().is_empty()),
            document_updated: response.portfolio_updated.unwrap_or(false),
            has_document: response.has_portfolio,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatHistoryResponse {
    #[serde(rename = "chatHistory", default)]
    pub chat_history: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryRequest<'a> {
    #[serde(rename = "chatHistory")]
    pub chat_history: &'a [Message],
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_maps_flags() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"response":"Done","html":"<html>b</html>","portfolio_updated":true,"has_portfolio":true}"#,
        )
        .unwrap();
        let reply = ChatReply::from(response);
        assert_eq!(reply.response_text, "Done");
        assert_eq!(reply.html.as_deref(), Some("<html>b</html>"));
        assert!(reply.document_updated);
        assert_eq!(reply.has_document, Some(true));
    }

    #[test]
    fn test_chat_response_minimal() {
        let response: ChatResponse = serde_json::from_str(r#"{"response":"Sure"}"#).unwrap();
        let reply = ChatReply::from(response);
        assert_eq!(reply.html, None);
        assert!(!reply.document_updated);
        assert_eq!(reply.has_document, None);
    }

    #[test]
    fn test_blank_inline_html_is_ignored() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"response":"ok","html":"  "}"#).unwrap();
        assert_eq!(ChatReply::from(response).html, None);
    }

    #[test]
    fn test_document_response_error_payload() {
        let response: DocumentResponse =
            serde_json::from_str(r#"{"error":"Unsupported file type"}"#).unwrap();
        assert_eq!(
            response.into_document(),
            Err(TransportError::rejected("Unsupported file type"))
        );
    }

    #[test]
    fn test_document_response_without_html() {
        let response: DocumentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(
            response.into_document(),
            Err(TransportError::ServerRejected { .. })
        ));
    }

    #[test]
    fn test_history_round_trip_shape() {
        let messages = vec![Message::user("hi", None), Message::bot("hello")];
        let body = serde_json::to_value(ChatHistoryRequest {
            chat_history: &messages,
        })
        .unwrap();
        assert_eq!(body["chatHistory"][1]["sender"], "bot");

        let parsed: ChatHistoryResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.chat_history, messages);
    }

    #[test]
    fn test_history_missing_field_is_empty() {
        let parsed: ChatHistoryResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.chat_history.is_empty());
    }
}
