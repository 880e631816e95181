use std::pin::Pin;
use std::sync::Arc;

use elevatr_api::{
    BackendError, ChatBackend, ChatRequest, ChatResponse, ConversationHistory,
};
use tracing::Instrument;

pub type BackendResult<T> = Result<T, Box<dyn BackendError>>;
type BoxedFuture<T> = Pin<Box<dyn Future<Output = BackendResult<T>> + Send>>;

/// Object-safe mirror of [`ChatBackend`].
trait BackendObject: Send + Sync {
    fn send_chat(&self, req: &ChatRequest) -> BoxedFuture<ChatResponse>;
    fn fetch_conversation(&self, id: &str) -> BoxedFuture<ConversationHistory>;
    fn delete_conversation(&self, id: &str) -> BoxedFuture<()>;
}

impl<B: ChatBackend + 'static> BackendObject for B {
    fn send_chat(&self, req: &ChatRequest) -> BoxedFuture<ChatResponse> {
        let fut = ChatBackend::send_chat(self, req);
        Box::pin(
            async move { fut.await.map_err(erase) }
                .instrument(trace_span!("backend send")),
        )
    }

    fn fetch_conversation(&self, id: &str) -> BoxedFuture<ConversationHistory> {
        let fut = ChatBackend::fetch_conversation(self, id);
        Box::pin(
            async move { fut.await.map_err(erase) }
                .instrument(trace_span!("backend fetch")),
        )
    }

    fn delete_conversation(&self, id: &str) -> BoxedFuture<()> {
        let fut = ChatBackend::delete_conversation(self, id);
        Box::pin(
            async move { fut.await.map_err(erase) }
                .instrument(trace_span!("backend delete")),
        )
    }
}

#[inline]
fn erase<E: BackendError>(err: E) -> Box<dyn BackendError> {
    warn!("backend failed: {err:?}");
    Box::new(err)
}

/// A wrapper around a chat backend that provides a type-erased interface
/// for the other modules.
///
/// The controller doesn't have a generic parameter for the backend and we
/// don't want it either.
#[derive(Clone)]
pub struct BackendClient {
    backend: Arc<dyn BackendObject>,
}

impl BackendClient {
    #[inline]
    pub fn new<B: ChatBackend + 'static>(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Starts a chat request.
    ///
    /// The request is issued when this method is called; the returned
    /// future only waits for its result. Dropping the future cancels the
    /// request.
    #[inline]
    pub fn send_chat(&self, req: &ChatRequest) -> BoxedFuture<ChatResponse> {
        trace!("got a request: {req:?}");
        self.backend.send_chat(req)
    }

    #[inline]
    pub fn fetch_conversation(
        &self,
        id: &str,
    ) -> BoxedFuture<ConversationHistory> {
        self.backend.fetch_conversation(id)
    }

    #[inline]
    pub fn delete_conversation(&self, id: &str) -> BoxedFuture<()> {
        self.backend.delete_conversation(id)
    }
}
