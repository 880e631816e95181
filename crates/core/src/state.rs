//! Chat state snapshots and the reducer that moves between them.

use elevatr_api::{Message, Role};

/// An immutable snapshot of the chat.
///
/// Snapshots never change in place. [`ChatState::reduce`] consumes one
/// snapshot and produces the next, so every transition is a pure function
/// of the previous state and an [`Action`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatState {
    messages: Vec<Message>,
    conversation_id: Option<String>,
    is_loading: bool,
    error: Option<String>,
}

/// A state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// A send began; the user message is shown before the server confirms
    /// it.
    SendStarted(Message),
    /// The server answered a send.
    SendSucceeded {
        /// The assistant message to append.
        reply: Message,
        /// Conversation to adopt, if the server started a new one.
        conversation_id: Option<String>,
    },
    /// A send failed; the optimistic message is rolled back.
    SendFailed {
        /// Id of the optimistic user message to remove.
        optimistic_id: String,
        /// User-facing error message.
        error: String,
    },
    /// A message was refused before reaching the network.
    Rejected(String),
    /// A conversation started loading.
    LoadStarted,
    /// A conversation was loaded and replaces the local history.
    LoadSucceeded {
        /// The loaded conversation.
        conversation_id: String,
        /// Its messages.
        messages: Vec<Message>,
    },
    /// Loading a conversation failed.
    LoadFailed(String),
    /// An operation that doesn't affect the history failed.
    Failed(String),
    /// The error banner was dismissed.
    ClearError,
    /// Everything is reset to a fresh conversation.
    Reset {
        /// The greeting that opens the fresh conversation.
        welcome: Message,
    },
}

impl ChatState {
    /// Creates a fresh conversation that only holds the greeting.
    #[inline]
    pub fn new(welcome: Message) -> Self {
        Self {
            messages: vec![welcome],
            ..Default::default()
        }
    }

    /// Applies `action` and returns the next snapshot.
    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::SendStarted(message) => {
                self.messages.push(message);
                self.is_loading = true;
                self.error = None;
            }
            Action::SendSucceeded {
                reply,
                conversation_id,
            } => {
                self.messages.push(reply);
                if conversation_id.is_some() {
                    self.conversation_id = conversation_id;
                }
                self.is_loading = false;
            }
            Action::SendFailed {
                optimistic_id,
                error,
            } => {
                // The optimistic message is the last one unless the history
                // was replaced in the meantime, in which case it's gone.
                if let Some(pos) =
                    self.messages.iter().rposition(|m| m.id == optimistic_id)
                {
                    self.messages.remove(pos);
                }
                self.is_loading = false;
                self.error = Some(error);
            }
            Action::Rejected(error) | Action::Failed(error) => {
                self.error = Some(error);
            }
            Action::LoadStarted => {
                self.is_loading = true;
                self.error = None;
            }
            Action::LoadSucceeded {
                conversation_id,
                messages,
            } => {
                self.messages = messages;
                self.conversation_id = Some(conversation_id);
                self.is_loading = false;
            }
            Action::LoadFailed(error) => {
                self.is_loading = false;
                self.error = Some(error);
            }
            Action::ClearError => {
                self.error = None;
            }
            Action::Reset { welcome } => {
                self = Self::new(welcome);
            }
        }
        self
    }

    /// Returns the messages in send order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the active conversation, if the server assigned one.
    #[inline]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Returns `true` while a request is in flight.
    #[inline]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns the error to show, if any.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the most recent message written by the user.
    #[inline]
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_user())
    }

    /// Summarizes the conversation.
    pub fn stats(&self) -> ConversationStats {
        let count = |role: Role| {
            self.messages.iter().filter(|m| m.role == role).count()
        };
        ConversationStats {
            total_messages: self.messages.len(),
            user_messages: count(Role::User),
            assistant_messages: count(Role::Assistant),
            has_conversation_id: self.conversation_id.is_some(),
            is_active: !self.is_loading && self.error.is_none(),
        }
    }
}

/// Counters describing a conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConversationStats {
    /// Number of messages, greeting included.
    pub total_messages: usize,
    /// Number of messages from the user.
    pub user_messages: usize,
    /// Number of messages from the assistant, greeting included.
    pub assistant_messages: usize,
    /// Whether the server assigned a conversation id.
    pub has_conversation_id: bool,
    /// Whether the chat is idle and without error.
    pub is_active: bool,
}
