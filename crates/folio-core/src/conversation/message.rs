//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message typed (or file attached) by the user.
    User,
    /// Message produced by the assistant, including typed-out errors.
    Bot,
}

/// A single entry of the conversation log.
///
/// The wire form matches the backend's `chatHistory` entries. Older
/// histories stored the attachment under `file`, which is accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, alias = "file", skip_serializing_if = "Option::is_none")]
    pub attached_file_name: Option<String>,
    /// Set only on the in-flight bot placeholder.
    #[serde(default)]
    pub pending: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, attached_file_name: Option<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            attached_file_name,
            pending: false,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            attached_file_name: None,
            pending: false,
        }
    }

    /// An empty bot entry standing in for a response that is being revealed.
    pub fn placeholder() -> Self {
        Self {
            pending: true,
            ..Self::bot(String::new())
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_placeholder(&self) -> bool {
        self.pending && self.sender == Sender::Bot
    }
}
