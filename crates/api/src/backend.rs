use std::error::Error;

use crate::error::ErrorKind;
use crate::wire::{ChatRequest, ChatResponse, ConversationHistory};

/// The error type for a chat backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;

    /// Returns the error text the server put in its response, if any.
    #[inline]
    fn server_message(&self) -> Option<&str> {
        None
    }
}

/// A type that represents the remote chat service.
///
/// Once the backend is created, it should behave like a stateless object.
/// Conversation state is owned by the server and by the controller, never
/// by the backend itself.
///
/// All returned futures must be `'static`, since the controller runs them
/// on their own tasks and may abort them at any time when a request gets
/// superseded. Dropping the future must cancel the underlying transport
/// operation.
pub trait ChatBackend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Sends a chat message and waits for the assistant reply.
    fn send_chat(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static;

    /// Fetches the history of a conversation.
    fn fetch_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ConversationHistory, Self::Error>> + Send + 'static;

    /// Deletes a conversation on the server.
    fn delete_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static;
}
