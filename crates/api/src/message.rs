use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The visitor.
    User,
    /// The AI assistant.
    Assistant,
}

/// A message in the conversation.
///
/// Messages are immutable once they are appended to a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Identifier of the message, unique within the conversation.
    pub id: String,
    /// Who wrote the message.
    pub role: Role,
    /// The text of the message.
    pub content: String,
    /// When the message was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh random id, stamped with the current
    /// time.
    #[inline]
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), role, content)
    }

    /// Creates a message with the given id, stamped with the current time.
    #[inline]
    pub fn with_id<ID: Into<String>, S: Into<String>>(
        id: ID,
        role: Role,
        content: S,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Returns `true` if the message was written by the visitor.
    #[inline]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
