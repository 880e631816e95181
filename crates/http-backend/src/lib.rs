//! A chat backend that talks to the Elevatr HTTP API.

#[macro_use]
extern crate tracing;

mod config;
mod decode;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use elevatr_api::{
    BackendError, ChatBackend, ChatReply, ChatRequest, ChatResponse,
    ConversationHistory, ErrorKind,
};
use reqwest::{Client, Url, header};
use serde_json::Value;
use tracing::Instrument;

pub use config::{HttpBackendConfig, HttpBackendConfigBuilder};
use decode::{RawResponse, decode_envelope, require_data};

/// Error type for [`HttpBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    server_message: Option<String>,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            server_message: None,
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        Self::new(format!("{err}"), ErrorKind::Transport)
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::MalformedResponse)
    }

    fn with_server_message(mut self, server_message: Option<String>) -> Self {
        self.server_message = server_message;
        self
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
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

/// Chat backend speaking JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<HttpBackendConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    #[inline]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Builds `{base}/chat[/{id}]`. The id is encoded as a single path
    /// segment.
    fn chat_url(&self, id: Option<&str>) -> Result<Url, Error> {
        let mut url = Url::parse(&self.config.base_url).map_err(|err| {
            Error::new(format!("invalid base URL: {err}"), ErrorKind::Transport)
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::new("base URL cannot be a base", ErrorKind::Transport)
            })?;
            segments.pop_if_empty().push("chat");
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

impl ChatBackend for HttpBackend {
    type Error = Error;

    fn send_chat(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let resp_fut = self.chat_url(None).map(|url| {
            self.client
                .post(url)
                .header(header::ACCEPT, "application/json")
                .json(req)
                .send()
        });
        let conversation_id = req.conversation_id.clone();

        async move {
            debug!("sending message");
            let resp = resp_fut?.await.map_err(Error::transport)?;
            let raw = RawResponse::read(resp).await?;
            let envelope = decode_envelope::<ChatReply>(
                raw,
                "Failed to send message to Elevatr",
            )?;
            let usage = envelope.usage.clone();
            let reply = require_data(envelope)?;
            trace!("got a reply: {reply:?}");
            Ok(ChatResponse { reply, usage })
        }
        .instrument(debug_span!("send chat", ?conversation_id))
    }

    fn fetch_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ConversationHistory, Self::Error>> + Send + 'static
    {
        let resp_fut = self
            .chat_url(Some(id))
            .map(|url| self.client.get(url).send());
        let id = id.to_owned();

        async move {
            let resp = resp_fut?.await.map_err(Error::transport)?;
            let raw = RawResponse::read(resp).await?;
            let envelope = decode_envelope::<ConversationHistory>(
                raw,
                "Failed to load conversation",
            )?;
            let history = require_data(envelope)?;
            debug!("loaded {} messages", history.messages.len());
            Ok(history)
        }
        .instrument(debug_span!("fetch conversation", %id))
    }

    fn delete_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let resp_fut = self
            .chat_url(Some(id))
            .map(|url| self.client.delete(url).send());
        let id = id.to_owned();

        async move {
            let resp = resp_fut?.await.map_err(Error::transport)?;
            let raw = RawResponse::read(resp).await?;
            // The payload of a deletion is irrelevant, only `success` counts.
            decode_envelope::<Value>(raw, "Failed to delete conversation")?;
            debug!("conversation deleted");
            Ok(())
        }
        .instrument(debug_span!("delete conversation", %id))
    }
}
