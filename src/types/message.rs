use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::MessageRole;

static NEXT_MESSAGE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identifier of the seeded greeting.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// Text of the seeded greeting.
pub const WELCOME_MESSAGE_TEXT: &str = "👋 Hello! I'm your AI assistant. I can:

- answer questions and explain concepts
- help write and review code
- offer suggestions and solutions
- help with learning and research

What can I help you with?";

/// An entry in the conversation log.
///
/// Messages are immutable once created.  Identifiers combine the creation time with a
/// process-wide sequence number, so two messages created in the same millisecond still differ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique identifier.
    pub id: String,

    /// Message text; may contain markdown.
    pub content: String,

    /// Who wrote the message.
    pub role: MessageRole,

    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    /// Create a message stamped with the current time and a fresh identifier.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        let timestamp = now_millis();
        let seq = NEXT_MESSAGE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{timestamp}-{seq}"),
            content: content.into(),
            role,
            timestamp,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// The greeting every conversation starts with.
    pub fn welcome() -> Self {
        Self {
            id: WELCOME_MESSAGE_ID.to_string(),
            content: WELCOME_MESSAGE_TEXT.to_string(),
            role: MessageRole::Assistant,
            timestamp: now_millis(),
        }
    }

    /// Returns true if this is the seeded greeting.
    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_MESSAGE_ID
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Message::user("one");
        let b = Message::user("one");
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, MessageRole::User);
        assert!(a.timestamp > 0);
    }

    #[test]
    fn welcome_is_assistant() {
        let welcome = Message::welcome();
        assert!(welcome.is_welcome());
        assert_eq!(welcome.role, MessageRole::Assistant);
        assert_eq!(welcome.content, WELCOME_MESSAGE_TEXT);
        assert!(!Message::assistant("hi").is_welcome());
    }
}
