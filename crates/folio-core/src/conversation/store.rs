//! The conversation log and its pending tail slot.

use std::sync::Arc;

use super::message::Message;
use crate::error::{FolioError, Result};

/// Immutable view of the conversation handed to renderers and persistence.
pub type ConversationSnapshot = Arc<[Message]>;

/// Append-only conversation log with one mutable tail slot.
///
/// The store has a single writer (the orchestrator). Readers only ever get
/// [`ConversationSnapshot`]s, never a reference into the live log.
///
/// # Invariants
///
/// - At most one pending bot placeholder exists, and it is the last entry.
/// - Entries before the tail are never edited after they are appended.
/// - `commit_bot_text` finalizes the placeholder exactly once; calling it
///   again without a new placeholder returns [`FolioError::InvalidState`].
#[derive(Debug, Default)]
pub struct ConversationStore {
    log: Vec<Message>,
    revision: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message.
    ///
    /// Always permitted. If a bot placeholder is pending, the message is
    /// placed right before it so the placeholder stays the tail.
    pub fn append_user(&mut self, message: Message) {
        let message = Message {
            pending: false,
            ..message
        };
        if self.has_placeholder() {
            let tail = self.log.len() - 1;
            self.log.insert(tail, message);
        } else {
            self.log.push(message);
        }
        self.touch();
    }

    /// Inserts the pending bot entry at the tail.
    pub fn begin_bot_placeholder(&mut self) -> Result<()> {
        if self.has_placeholder() {
            return Err(FolioError::invalid_state(
                "a bot placeholder is already pending",
            ));
        }
        self.log.push(Message::placeholder());
        self.touch();
        Ok(())
    }

    /// Overwrites the placeholder text with the currently revealed prefix.
    pub fn update_placeholder(&mut self, text: &str) -> Result<()> {
        let tail = self.placeholder_mut()?;
        tail.text.clear();
        tail.text.push_str(text);
        self.touch();
        Ok(())
    }

    /// Replaces the placeholder with a finalized bot message.
    pub fn commit_bot_text(&mut self, text: impl Into<String>) -> Result<()> {
        let tail = self
            .placeholder_mut()
            .map_err(|_| FolioError::invalid_state("no pending bot message to commit"))?;
        *tail = Message::bot(text);
        self.touch();
        Ok(())
    }

    /// Drops the placeholder without committing anything.
    pub fn discard_placeholder(&mut self) -> Result<()> {
        if !self.has_placeholder() {
            return Err(FolioError::invalid_state(
                "no pending bot message to discard",
            ));
        }
        self.log.pop();
        self.touch();
        Ok(())
    }

    /// Hydrates an empty log from a stored conversation.
    ///
    /// Pending entries in the stored data are dropped; they belong to a reveal
    /// that never finished.
    pub fn restore(&mut self, messages: Vec<Message>) -> Result<()> {
        if !self.log.is_empty() {
            return Err(FolioError::invalid_state(
                "cannot restore into a non-empty conversation",
            ));
        }
        self.log = messages.into_iter().filter(|m| !m.pending).collect();
        self.touch();
        Ok(())
    }

    pub fn has_placeholder(&self) -> bool {
        self.log.last().is_some_and(Message::is_placeholder)
    }

    /// The text revealed so far, if a placeholder is pending.
    pub fn pending_text(&self) -> Option<&str> {
        self.log
            .last()
            .filter(|m| m.is_placeholder())
            .map(|m| m.text.as_str())
    }

    /// Immutable copy of the whole log, placeholder included.
    pub fn snapshot(&self) -> ConversationSnapshot {
        Arc::from(self.log.as_slice())
    }

    /// Finalized messages only, in order. This is what gets persisted.
    pub fn committed(&self) -> Vec<Message> {
        self.log.iter().filter(|m| !m.pending).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Increases on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn placeholder_mut(&mut self) -> Result<&mut Message> {
        match self.log.last_mut() {
            Some(tail) if tail.is_placeholder() => Ok(tail),
            _ => Err(FolioError::invalid_state("no pending bot message")),
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
