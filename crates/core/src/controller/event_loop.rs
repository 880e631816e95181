use std::mem;
use std::sync::Arc;

use elevatr_api::{
    ChatRequest, ChatResponse, ConversationHistory, Message, Role,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::AbortHandle;

use super::SendOutcome;
use crate::backend_client::{BackendClient, BackendResult};
use crate::config::{ChatConfig, ChatOptions};
use crate::error::ChatError;
use crate::state::{Action, ChatState};
use crate::validate::validate_message;

const SEND_FAILED: &str = "Failed to send message to Elevatr";
const LOAD_FAILED: &str = "Failed to load conversation";
const DELETE_FAILED: &str = "Failed to delete conversation";

type Reply<T> = oneshot::Sender<Result<T, ChatError>>;

#[derive(Debug)]
pub enum Command {
    Send {
        text: String,
        options: ChatOptions,
        reply: Reply<SendOutcome>,
    },
    PrepareRetry {
        reply: oneshot::Sender<Option<String>>,
    },
    Clear {
        done: oneshot::Sender<()>,
    },
    Load {
        id: String,
        reply: Reply<Option<ConversationHistory>>,
    },
    Delete {
        id: Option<String>,
        reply: Reply<bool>,
    },
    SendFinished {
        generation: u64,
        result: BackendResult<ChatResponse>,
    },
    LoadFinished {
        generation: u64,
        result: BackendResult<ConversationHistory>,
    },
    DeleteFinished {
        id: String,
        result: BackendResult<()>,
        reply: Reply<bool>,
    },
}

/// Handle to the request in flight.
///
/// Completions carry the generation of the request they belong to, and
/// are only committed while the handle of that generation is current.
#[derive(Debug)]
struct CancelHandle {
    generation: u64,
    abort: AbortHandle,
}

impl CancelHandle {
    #[inline]
    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Aborts the request task, which drops the transport future.
    #[inline]
    fn cancel(self) {
        self.abort.abort();
    }
}

#[derive(Debug)]
enum Pending {
    Send {
        optimistic_id: String,
        text: String,
        reply: Reply<SendOutcome>,
    },
    Load {
        id: String,
        reply: Reply<Option<ConversationHistory>>,
    },
}

#[derive(Debug)]
struct InFlight {
    handle: CancelHandle,
    pending: Pending,
}

pub struct ControllerState {
    backend: BackendClient,
    config: Arc<ChatConfig>,
    state: ChatState,
    state_tx: watch::Sender<ChatState>,
    cmd_tx: mpsc::WeakUnboundedSender<Command>,
    in_flight: Option<InFlight>,
    next_generation: u64,
    // Text of the last send that was rolled back, so that a retry resends
    // what the user actually wrote last.
    failed_input: Option<String>,
}

impl ControllerState {
    pub fn new(
        backend: BackendClient,
        config: Arc<ChatConfig>,
        state: ChatState,
        state_tx: watch::Sender<ChatState>,
        cmd_tx: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            backend,
            config,
            state,
            state_tx,
            cmd_tx,
            in_flight: None,
            next_generation: 1,
            failed_input: None,
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Send {
                text,
                options,
                reply,
            } => self.start_send(text, options, reply),
            Command::PrepareRetry { reply } => {
                if let Some(InFlight {
                    pending: Pending::Send { .. },
                    ..
                }) = &self.in_flight
                {
                    debug!("ignoring retry while a send is in flight");
                    reply.send(None).ok();
                    return;
                }
                let text = self.failed_input.clone().or_else(|| {
                    self.state.last_user_message().map(|m| m.content.clone())
                });
                self.apply(Action::ClearError);
                reply.send(text).ok();
            }
            Command::Clear { done } => {
                self.reset();
                done.send(()).ok();
            }
            Command::Load { id, reply } => self.start_load(id, reply),
            Command::Delete { id, reply } => self.start_delete(id, reply),
            Command::SendFinished { generation, result } => {
                self.finish_send(generation, result);
            }
            Command::LoadFinished { generation, result } => {
                self.finish_load(generation, result);
            }
            Command::DeleteFinished { id, result, reply } => {
                self.finish_delete(id, result, reply);
            }
        }
    }

    fn apply(&mut self, action: Action) {
        trace!("applying {action:?}");
        self.state = mem::take(&mut self.state).reduce(action);
        self.state_tx.send_replace(self.state.clone());
    }

    /// Cancels the request in flight, if any, and tells its caller.
    fn supersede(&mut self) {
        let Some(InFlight { handle, pending }) = self.in_flight.take() else {
            return;
        };
        debug!("superseding request #{}", handle.generation);
        handle.cancel();
        match pending {
            Pending::Send { reply, .. } => {
                reply.send(Ok(SendOutcome::Superseded)).ok();
            }
            Pending::Load { reply, .. } => {
                reply.send(Ok(None)).ok();
            }
        }
    }

    fn reset(&mut self) {
        self.supersede();
        self.failed_input = None;
        self.apply(Action::Reset {
            welcome: self.config.welcome_message(),
        });
        debug!("conversation cleared");
    }

    /// Spawns `fut` and routes its output back into the loop.
    fn spawn_request<F, Fut>(&mut self, f: F) -> Option<CancelHandle>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Command> + Send + 'static,
    {
        let cmd_tx = self.cmd_tx.upgrade()?;
        let generation = self.next_generation;
        self.next_generation += 1;

        let fut = f(generation);
        let task = tokio::spawn(async move {
            cmd_tx.send(fut.await).ok();
        });
        Some(CancelHandle {
            generation,
            abort: task.abort_handle(),
        })
    }

    fn start_send(
        &mut self,
        text: String,
        options: ChatOptions,
        reply: Reply<SendOutcome>,
    ) {
        if let Err(invalid) =
            validate_message(&text, self.config.max_message_length())
        {
            debug!("rejected message: {invalid}");
            self.apply(Action::Rejected(invalid.to_string()));
            reply.send(Ok(SendOutcome::Rejected(invalid.into()))).ok();
            return;
        }

        self.supersede();

        let user_message = Message::user(text.clone());
        let optimistic_id = user_message.id.clone();
        self.apply(Action::SendStarted(user_message));

        let (temperature, max_tokens) = self.config.resolve(&options);
        let request = ChatRequest::new(text.clone(), temperature, max_tokens)
            .in_conversation(self.state.conversation_id());
        debug!(
            conversation_id = ?request.conversation_id,
            "sending message"
        );

        let resp_fut = self.backend.send_chat(&request);
        let handle = self.spawn_request(move |generation| async move {
            let result = resp_fut.await;
            Command::SendFinished { generation, result }
        });
        let Some(handle) = handle else {
            // Nobody holds the controller anymore, so nobody waits either.
            return;
        };
        self.in_flight = Some(InFlight {
            handle,
            pending: Pending::Send {
                optimistic_id,
                text,
                reply,
            },
        });
    }

    /// Takes the pending request of `generation`, or `None` if it has been
    /// superseded.
    fn take_current(&mut self, generation: u64) -> Option<Pending> {
        match &self.in_flight {
            Some(in_flight) if in_flight.handle.is_current(generation) => {
                self.in_flight.take().map(|in_flight| in_flight.pending)
            }
            _ => {
                trace!("discarding result of stale request #{generation}");
                None
            }
        }
    }

    fn finish_send(
        &mut self,
        generation: u64,
        result: BackendResult<ChatResponse>,
    ) {
        let Some(Pending::Send {
            optimistic_id,
            text,
            reply,
        }) = self.take_current(generation)
        else {
            return;
        };

        match result {
            Ok(ChatResponse { reply: data, usage }) => {
                if let Some(usage) = usage {
                    debug!("usage: {usage}");
                }
                let conversation_id = data
                    .conversation_id
                    .clone()
                    .filter(|id| data.is_new_conversation && !id.is_empty());
                if let Some(id) = &conversation_id {
                    info!("new conversation started: {id}");
                }
                self.failed_input = None;
                self.apply(Action::SendSucceeded {
                    reply: Message::with_id(
                        data.message_id.clone(),
                        Role::Assistant,
                        data.message.clone(),
                    ),
                    conversation_id,
                });
                reply.send(Ok(SendOutcome::Delivered(data))).ok();
            }
            Err(err) => {
                let err = ChatError::from_backend(err, SEND_FAILED);
                self.failed_input = Some(text);
                self.apply(Action::SendFailed {
                    optimistic_id,
                    error: err.to_string(),
                });
                reply.send(Err(err)).ok();
            }
        }
    }

    fn start_load(
        &mut self,
        id: String,
        reply: Reply<Option<ConversationHistory>>,
    ) {
        if id.trim().is_empty() {
            reply.send(Ok(None)).ok();
            return;
        }

        self.supersede();
        self.apply(Action::LoadStarted);
        debug!("loading conversation {id}");

        let history_fut = self.backend.fetch_conversation(&id);
        let handle = self.spawn_request(move |generation| async move {
            let result = history_fut.await;
            Command::LoadFinished { generation, result }
        });
        let Some(handle) = handle else {
            return;
        };
        self.in_flight = Some(InFlight {
            handle,
            pending: Pending::Load { id, reply },
        });
    }

    fn finish_load(
        &mut self,
        generation: u64,
        result: BackendResult<ConversationHistory>,
    ) {
        let Some(Pending::Load { id, reply }) = self.take_current(generation)
        else {
            return;
        };

        match result {
            Ok(history) => {
                debug!(
                    "loaded {} messages for conversation {id}",
                    history.messages.len()
                );
                self.failed_input = None;
                self.apply(Action::LoadSucceeded {
                    conversation_id: id,
                    messages: history.messages.clone(),
                });
                reply.send(Ok(Some(history))).ok();
            }
            Err(err) => {
                let err = ChatError::from_backend(err, LOAD_FAILED);
                self.apply(Action::LoadFailed(err.to_string()));
                reply.send(Err(err)).ok();
            }
        }
    }

    fn start_delete(&mut self, id: Option<String>, reply: Reply<bool>) {
        // A blank id names nothing; only an absent one means the active
        // conversation.
        let target = match id {
            Some(id) => Some(id).filter(|id| !id.trim().is_empty()),
            None => self.state.conversation_id().map(ToOwned::to_owned),
        };
        let Some(target) = target else {
            reply.send(Ok(false)).ok();
            return;
        };
        let Some(cmd_tx) = self.cmd_tx.upgrade() else {
            return;
        };
        debug!("deleting conversation {target}");

        // Deletions don't occupy the in-flight slot, a send may still run.
        let delete_fut = self.backend.delete_conversation(&target);
        tokio::spawn(async move {
            let result = delete_fut.await;
            cmd_tx
                .send(Command::DeleteFinished {
                    id: target,
                    result,
                    reply,
                })
                .ok();
        });
    }

    fn finish_delete(
        &mut self,
        id: String,
        result: BackendResult<()>,
        reply: Reply<bool>,
    ) {
        match result {
            Ok(()) => {
                info!("conversation {id} deleted");
                if self.state.conversation_id() == Some(id.as_str()) {
                    self.reset();
                }
                reply.send(Ok(true)).ok();
            }
            Err(err) => {
                let err = ChatError::from_backend(err, DELETE_FAILED);
                self.apply(Action::Failed(err.to_string()));
                reply.send(Err(err)).ok();
            }
        }
    }
}

pub async fn run_controller(
    mut state: ControllerState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    debug!("started");
    while let Some(cmd) = cmd_rx.recv().await {
        trace!("received command: {cmd:?}");
        state.handle(cmd);
    }
    if let Some(in_flight) = state.in_flight.take() {
        in_flight.handle.cancel();
    }
    debug!("will terminate");
}
