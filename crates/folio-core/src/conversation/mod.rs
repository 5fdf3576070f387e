//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `message`: Message types (`Sender`, `Message`)
//! - `store`: The single-writer conversation log (`ConversationStore`)
//!
//! # Usage
//!
//! ```ignore
//! use folio_core::conversation::{ConversationStore, Message, Sender};
//! ```

mod message;
mod store;

// Re-export public API
pub use message::{Message, Sender};
pub use store::{ConversationSnapshot, ConversationStore};
