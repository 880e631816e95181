use std::time::Duration;

use elevatr_api::ChatReply;
use serde::{Deserialize, Serialize};

/// How the backend answers one chat request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetOutcome {
    /// A successful reply.
    #[serde(rename = "reply")]
    Reply(ChatReply),
    /// A non-success HTTP status, optionally with the server's error text.
    #[serde(rename = "status")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// Error text from the body.
        error: Option<String>,
    },
    /// `success: false` with an optional error text.
    #[serde(rename = "rejected")]
    Rejected(Option<String>),
    /// A body that doesn't look like an envelope.
    #[serde(rename = "malformed")]
    Malformed,
    /// The connection failed.
    #[serde(rename = "transport")]
    Transport,
}

/// The preset answer for a chat request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetReply {
    /// What the backend answers.
    pub outcome: PresetOutcome,
    /// If set, overrides the backend delay for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl PresetReply {
    /// Creates a reply that continues the current conversation.
    #[inline]
    pub fn reply<S1: Into<String>, S2: Into<String>>(
        message: S1,
        message_id: S2,
    ) -> Self {
        Self::with_outcome(PresetOutcome::Reply(ChatReply {
            message: message.into(),
            message_id: message_id.into(),
            conversation_id: None,
            is_new_conversation: false,
        }))
    }

    /// Creates a reply that starts the conversation `conversation_id`.
    #[inline]
    pub fn new_conversation<S1, S2, S3>(
        message: S1,
        message_id: S2,
        conversation_id: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::with_outcome(PresetOutcome::Reply(ChatReply {
            message: message.into(),
            message_id: message_id.into(),
            conversation_id: Some(conversation_id.into()),
            is_new_conversation: true,
        }))
    }

    /// Creates a failure with the given HTTP status.
    #[inline]
    pub fn status(status: u16) -> Self {
        Self::with_outcome(PresetOutcome::Status {
            status,
            error: None,
        })
    }

    /// Creates a preset with the specified outcome.
    #[inline]
    pub fn with_outcome(outcome: PresetOutcome) -> Self {
        Self {
            outcome,
            delay_ms: None,
        }
    }

    /// Delays this answer by `delay`.
    #[inline]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(delay.as_millis() as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_script() {
        let script: Vec<PresetReply> = serde_json::from_str(
            r#"[
                {
                    "outcome": {
                        "type": "reply",
                        "data": {
                            "message": "Hi!",
                            "messageId": "m1",
                            "conversationId": "c1",
                            "isNewConversation": true
                        }
                    },
                    "delay_ms": 20
                },
                { "outcome": { "type": "status", "data": { "status": 429 } } },
                { "outcome": { "type": "malformed" } }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            script[0],
            PresetReply::new_conversation("Hi!", "m1", "c1")
                .with_delay(Duration::from_millis(20))
        );
        assert_eq!(script[1], PresetReply::status(429));
        assert_eq!(script[2].outcome, PresetOutcome::Malformed);
    }
}
