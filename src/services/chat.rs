//! Chat service — append-only message ledger with soft delete.
//!
//! DESIGN
//! ======
//! Messages are never physically removed. Ids are ordinals assigned at
//! send time starting from 1, so an id handed to other participants keeps
//! pointing at the same message forever. Unsend only flips `visible`, and
//! only the author may unsend their own message.
//!
//! Followers replicate the leader's ledger: `record` stores a message under
//! the id it was sent with and `hide` applies an unsend already authorized
//! on the leader's side.
//!
//! `list` is a pure projection over the ledger; calling it repeatedly
//! yields the same sequence until the next mutation.

use serde::{Deserialize, Serialize};

use crate::frame::{Data, ErrorCode, Frame, SYSCALL_CHAT_SEND, SYSCALL_CHAT_UNSEND, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message text is empty")]
    EmptyInput,
    #[error("message not found: {0}")]
    UnknownId(u64),
    #[error("message {id} belongs to {author}")]
    NotAuthor { id: u64, author: String },
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "E_EMPTY_INPUT",
            Self::UnknownId(_) => "E_UNKNOWN_ID",
            Self::NotAuthor { .. } => "E_NOT_AUTHOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub author: String,
    /// Text as typed; only emptiness is judged on the trimmed form.
    pub text: String,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
    pub visible: bool,
}

impl Message {
    /// Wire shape announcing this message to other participants.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::request(SYSCALL_CHAT_SEND, Data::new())
            .with_data("message_id", self.id)
            .with_data("author", self.author.clone())
            .with_data("text", self.text.clone())
            .with_data("created_at", self.created_at)
    }
}

/// Wire shape announcing an unsend to other participants.
#[must_use]
pub fn unsend_frame(id: u64) -> Frame {
    Frame::request(SYSCALL_CHAT_UNSEND, Data::new()).with_data("message_id", id)
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Debug, Default)]
pub struct ChatLedger {
    messages: Vec<Message>,
}

impl ChatLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message from `author`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` if `text` is empty after trimming.
    pub fn send(&mut self, author: &str, text: &str) -> Result<&Message, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let id = self.next_id();
        self.messages.push(Message {
            id,
            author: author.to_string(),
            text: text.to_string(),
            created_at: now_ms(),
            visible: true,
        });

        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Hide message `id`. Unsending an already hidden message succeeds and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `UnknownId` if no message has that id and `NotAuthor` if
    /// `requester` did not write it.
    pub fn unsend(&mut self, id: u64, requester: &str) -> Result<&Message, ChatError> {
        let msg = self.get(id).ok_or(ChatError::UnknownId(id))?;
        if msg.author != requester {
            return Err(ChatError::NotAuthor { id, author: msg.author.clone() });
        }
        self.hide(id)
    }

    // -------------------------------------------------------------------------
    // Replication
    // -------------------------------------------------------------------------

    /// Store a message another participant sent, keeping ids in order.
    /// Returns `false` if a message with that id is already held.
    pub fn record(&mut self, message: Message) -> bool {
        match self.messages.binary_search_by_key(&message.id, |m| m.id) {
            Ok(_) => false,
            Err(pos) => {
                self.messages.insert(pos, message);
                true
            }
        }
    }

    /// Hide message `id` on behalf of its author elsewhere. Authorship was
    /// already checked where the unsend happened.
    ///
    /// # Errors
    ///
    /// Returns `UnknownId` if no message has that id.
    pub fn hide(&mut self, id: u64) -> Result<&Message, ChatError> {
        let msg = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(ChatError::UnknownId(id))?;
        msg.visible = false;
        Ok(&*msg)
    }

    /// Visible messages in send order.
    pub fn list(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(|m| m.visible)
    }

    /// Any message by id, hidden ones included.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Total messages ever sent, hidden ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.list().count()
    }

    fn next_id(&self) -> u64 {
        self.messages.last().map_or(1, |m| m.id + 1)
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
