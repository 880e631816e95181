mod event_loop;

use std::sync::Arc;

use elevatr_api::{ChatBackend, ChatReply, ConversationHistory};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::backend_client::BackendClient;
use crate::config::{ChatConfig, ChatOptions};
use crate::error::ChatError;
use crate::state::{ChatState, ConversationStats};
use event_loop::{Command, ControllerState, run_controller};

/// The result of a send that didn't fail.
#[derive(Debug)]
pub enum SendOutcome {
    /// The assistant answered.
    Delivered(ChatReply),
    /// The message was refused before reaching the network. The error is
    /// also shown in the state.
    Rejected(ChatError),
    /// A newer request took over before this one finished. Nothing this
    /// request would have done has been applied.
    Superseded,
}

impl SendOutcome {
    /// Returns the reply, if the assistant answered.
    #[inline]
    pub fn reply(&self) -> Option<&ChatReply> {
        match self {
            SendOutcome::Delivered(reply) => Some(reply),
            _ => None,
        }
    }
}

/// [`ChatController`] builder.
pub struct ChatControllerBuilder {
    backend: BackendClient,
    config: ChatConfig,
}

impl ChatControllerBuilder {
    /// Creates a new builder with the specified backend.
    #[inline]
    pub fn with_backend<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            backend: BackendClient::new(backend),
            config: ChatConfig::default(),
        }
    }

    /// Sets the configuration. Defaults are used otherwise.
    #[inline]
    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the controller and starts its event loop.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn build(self) -> ChatController {
        let config = Arc::new(self.config);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let initial = ChatState::new(config.welcome_message());
        let (state_tx, state_rx) = watch::channel(initial.clone());

        let state = ControllerState::new(
            self.backend,
            Arc::clone(&config),
            initial,
            state_tx,
            cmd_tx.downgrade(),
        );
        tokio::spawn(
            run_controller(state, cmd_rx).instrument(debug_span!("controller")),
        );

        ChatController {
            cmd_tx,
            state_rx,
            config,
        }
    }
}

/// The single source of truth of a chat: message history, loading and
/// error flags, and the conversation identity.
///
/// All state lives on one task that handles commands in order, so every
/// transition is atomic from the caller's perspective. At most one request
/// is in flight: starting a send or a load cancels the previous one, whose
/// late result is ignored.
///
/// The controller is a cheap handle; clones drive the same chat. The chat
/// stops when the last handle is dropped.
#[derive(Clone)]
pub struct ChatController {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ChatState>,
    config: Arc<ChatConfig>,
}

impl ChatController {
    /// Sends a message to the assistant.
    ///
    /// The user message is appended right away and removed again if the
    /// request fails. Failures are also shown in the state, and returned
    /// so the caller can react.
    pub async fn send_message(
        &self,
        text: &str,
        options: ChatOptions,
    ) -> Result<SendOutcome, ChatError> {
        let (reply, reply_rx) = oneshot::channel();
        self.dispatch(
            Command::Send {
                text: text.to_owned(),
                options,
                reply,
            },
            reply_rx,
        )
        .await?
    }

    /// Sends the most recent user message again with default options.
    ///
    /// Returns `Ok(None)` if the user hasn't written anything yet, or if a
    /// send is still in flight.
    pub async fn retry_last_message(
        &self,
    ) -> Result<Option<SendOutcome>, ChatError> {
        let (reply, reply_rx) = oneshot::channel();
        let text = self.dispatch(Command::PrepareRetry { reply }, reply_rx);
        let Some(text) = text.await? else {
            return Ok(None);
        };
        debug!("retrying: {text:?}");
        self.send_message(&text, ChatOptions::default()).await.map(Some)
    }

    /// Drops the current conversation and starts over from the greeting.
    ///
    /// A request in flight is cancelled.
    pub async fn clear_conversation(&self) {
        let (done, done_rx) = oneshot::channel();
        self.dispatch(Command::Clear { done }, done_rx).await.ok();
    }

    /// Replaces the local history with the conversation `id` held by the
    /// server.
    ///
    /// Returns `Ok(None)` if `id` is blank, or if a newer request took over
    /// before the history arrived.
    pub async fn load_conversation(
        &self,
        id: &str,
    ) -> Result<Option<ConversationHistory>, ChatError> {
        let (reply, reply_rx) = oneshot::channel();
        self.dispatch(
            Command::Load {
                id: id.to_owned(),
                reply,
            },
            reply_rx,
        )
        .await?
    }

    /// Deletes a conversation on the server, the active one if `id` is
    /// `None`.
    ///
    /// Returns `Ok(false)` if there is nothing to delete, which includes a
    /// blank `id`. Deleting the active conversation also clears the local
    /// state.
    pub async fn delete_conversation(
        &self,
        id: Option<&str>,
    ) -> Result<bool, ChatError> {
        let (reply, reply_rx) = oneshot::channel();
        self.dispatch(
            Command::Delete {
                id: id.map(ToOwned::to_owned),
                reply,
            },
            reply_rx,
        )
        .await?
    }

    /// Returns the current state.
    #[inline]
    pub fn snapshot(&self) -> ChatState {
        self.state_rx.borrow().clone()
    }

    /// Returns a receiver that is notified on every state transition.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state_rx.clone()
    }

    /// Summarizes the current conversation.
    #[inline]
    pub fn stats(&self) -> ConversationStats {
        self.state_rx.borrow().stats()
    }

    /// Returns the maximum length of a message, in characters.
    #[inline]
    pub fn max_message_length(&self) -> usize {
        self.config.max_message_length()
    }

    async fn dispatch<T>(
        &self,
        cmd: Command,
        reply_rx: oneshot::Receiver<T>,
    ) -> Result<T, ChatError> {
        if self.cmd_tx.send(cmd).is_err() {
            return Err(ChatError::stopped());
        }
        reply_rx.await.map_err(|_| ChatError::stopped())
    }
}
