//! A local scripted chat backend for testing purpose.

mod preset;

use std::collections::{HashMap, VecDeque};
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use elevatr_api::{
    BackendError, ChatBackend, ChatRequest, ChatResponse, ConversationHistory,
    ErrorKind, Message,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
    server_message: Option<String>,
}

impl Error {
    fn new(message: &'static str, kind: ErrorKind) -> Self {
        Self {
            message,
            kind,
            server_message: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    fn server_message(&self) -> Option<&str> {
        self.server_message.as_deref()
    }
}

#[derive(Default)]
struct State {
    script: VecDeque<PresetReply>,
    requests: Vec<ChatRequest>,
    conversations: HashMap<String, Vec<Message>>,
    deleted: Vec<String>,
    delay: Option<Duration>,
}

/// A local scripted backend for testing purpose.
///
/// Before sending requests, you need to queue the replies the backend
/// should give. Each chat request consumes the next queued reply; when the
/// queue is exhausted a transport error is returned. Every chat request is
/// recorded at the moment it's issued, so tests can tell whether a request
/// ever reached the "network".
///
/// Clones share the same script and records.
///
/// # Note
///
/// This type is not optimized for production use. You should only use it
/// for testing.
#[derive(Clone, Default)]
pub struct TestBackend {
    state: Arc<Mutex<State>>,
}

impl TestBackend {
    #[inline]
    fn state(&self) -> MutexGuard<'_, State> {
        // Records stay readable after a test thread panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues the answer for the next chat request.
    #[inline]
    pub fn add_reply(&self, preset: PresetReply) {
        self.state().script.push_back(preset);
    }

    /// Sets the default delay before answering any request.
    #[inline]
    pub fn set_delay(&self, duration: Duration) {
        self.state().delay = Some(duration);
    }

    /// Stores a conversation that can be fetched or deleted.
    #[inline]
    pub fn add_conversation<S: Into<String>>(
        &self,
        id: S,
        messages: Vec<Message>,
    ) {
        self.state().conversations.insert(id.into(), messages);
    }

    /// Returns the chat requests issued so far.
    #[inline]
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.state().requests.clone()
    }

    /// Returns the ids of the conversations deleted so far.
    #[inline]
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }
}

impl Debug for TestBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("TestBackend")
            .field("pending_replies", &state.script.len())
            .field("requests", &state.requests.len())
            .finish_non_exhaustive()
    }
}

impl ChatBackend for TestBackend {
    type Error = crate::Error;

    fn send_chat(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let (preset, delay) = {
            let mut state = self.state();
            state.requests.push(req.clone());
            (state.script.pop_front(), state.delay)
        };
        let delay = preset
            .as_ref()
            .and_then(|p| p.delay_ms)
            .map(Duration::from_millis)
            .or(delay);

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            let Some(preset) = preset else {
                return Err(Error::new(
                    "no enough replies",
                    ErrorKind::Transport,
                ));
            };
            match preset.outcome {
                PresetOutcome::Reply(reply) => Ok(ChatResponse {
                    reply,
                    usage: None,
                }),
                PresetOutcome::Status { status, error } => Err(Error {
                    message: "preset status",
                    kind: ErrorKind::Status(status),
                    server_message: error,
                }),
                PresetOutcome::Rejected(error) => Err(Error {
                    message: "preset rejection",
                    kind: ErrorKind::Rejected,
                    server_message: error,
                }),
                PresetOutcome::Malformed => Err(Error::new(
                    "preset malformed body",
                    ErrorKind::MalformedResponse,
                )),
                PresetOutcome::Transport => Err(Error::new(
                    "preset transport failure",
                    ErrorKind::Transport,
                )),
            }
        }
    }

    fn fetch_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ConversationHistory, Self::Error>> + Send + 'static
    {
        let (messages, delay) = {
            let state = self.state();
            (state.conversations.get(id).cloned(), state.delay)
        };

        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            match messages {
                Some(messages) => Ok(ConversationHistory { messages }),
                None => Err(Error::new(
                    "unknown conversation",
                    ErrorKind::Status(404),
                )),
            }
        }
    }

    fn delete_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let removed = {
            let mut state = self.state();
            let removed = state.conversations.remove(id).is_some();
            if removed {
                state.deleted.push(id.to_owned());
            }
            removed
        };

        async move {
            if removed {
                Ok(())
            } else {
                Err(Error::new("unknown conversation", ErrorKind::Status(404)))
            }
        }
    }
}
