use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Message;

// ---------------------
// Types sent to the server
// ---------------------

/// Body of a `POST /chat` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Upper bound of tokens in the reply.
    pub max_tokens: u32,
    /// The conversation to continue. The key is left out of the payload
    /// entirely when there is no conversation yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Creates a request that starts a new conversation.
    #[inline]
    pub fn new<S: Into<String>>(
        message: S,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            message: message.into(),
            temperature,
            max_tokens,
            conversation_id: None,
        }
    }

    /// Continues the given conversation. Blank ids are ignored.
    #[inline]
    pub fn in_conversation(mut self, conversation_id: Option<&str>) -> Self {
        self.conversation_id = conversation_id
            .filter(|id| !id.trim().is_empty())
            .map(ToOwned::to_owned);
        self
    }
}

// ---------------------------
// Types received from the server
// ---------------------------

/// The envelope every backend endpoint answers with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the server handled the request.
    pub success: bool,
    /// The payload, present on success.
    pub data: Option<T>,
    /// Token usage statistics, if the server reports them.
    pub usage: Option<Usage>,
    /// Error text, present on failure.
    pub error: Option<String>,
}

/// Token usage reported by the server. Its shape is up to the server, so
/// it's kept as raw JSON and only logged.
pub type Usage = Value;

/// The `data` payload of a successful `POST /chat` response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    /// The assistant's answer.
    pub message: String,
    /// Identifier the server assigned to the answer.
    pub message_id: String,
    /// The conversation the answer belongs to.
    pub conversation_id: Option<String>,
    /// Whether the server started a new conversation for this request.
    #[serde(default)]
    pub is_new_conversation: bool,
}

/// A complete answer to a chat request.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatResponse {
    /// The reply payload.
    pub reply: ChatReply,
    /// Token usage, if reported.
    pub usage: Option<Usage>,
}

/// The `data` payload of a successful `GET /chat/{id}` response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationHistory {
    /// Messages of the conversation in send order.
    pub messages: Vec<Message>,
}
