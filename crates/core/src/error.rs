//! Normalization of failures into user-facing messages.

use std::error::Error as StdError;
use std::fmt::{self, Display};

use elevatr_api::{BackendError, ErrorKind};

use crate::validate::InvalidMessage;

const RATE_LIMITED: &str =
    "Too many requests. Please wait a moment and try again. ⏳";
const BAD_REQUEST: &str = "Invalid request. Please check your input. ❌";
const NOT_FOUND: &str = "Resource not found. 🔍";
const SERVER_ERROR: &str = "Server error. Please try again later. 🔧";
const MALFORMED_RESPONSE: &str = "Invalid response format from server";
const GENERIC: &str = "Something went wrong. Please try again. 🔄";
const STOPPED: &str = "The chat controller has stopped.";

/// The category of a [`ChatError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatErrorKind {
    /// The message was refused before reaching the network.
    Validation,
    /// The server is rate limiting the client (HTTP 429).
    RateLimited,
    /// The server refused the request as invalid (HTTP 400).
    BadRequest,
    /// The requested resource doesn't exist (HTTP 404).
    NotFound,
    /// The server failed (HTTP 5xx).
    Server,
    /// The response didn't have the expected shape.
    MalformedResponse,
    /// Any other errors.
    Other,
}

/// An error surfaced to the user.
///
/// The `Display` output is the message meant for the error banner. The
/// backend error it was derived from, if any, is available through
/// [`StdError::source`].
#[derive(Debug)]
pub struct ChatError {
    kind: ChatErrorKind,
    message: String,
    source: Option<Box<dyn BackendError>>,
}

impl ChatError {
    /// Maps a backend error to a user-facing error.
    ///
    /// `fallback` is shown when the server refused the request with
    /// `success: false` and no explanation.
    pub fn from_backend(err: Box<dyn BackendError>, fallback: &str) -> Self {
        let server_message = err
            .server_message()
            .map(str::trim)
            .filter(|msg| !msg.is_empty())
            .map(ToOwned::to_owned);

        let (kind, message) = match err.kind() {
            ErrorKind::Status(429) => {
                (ChatErrorKind::RateLimited, RATE_LIMITED.to_owned())
            }
            ErrorKind::Status(400) => (
                ChatErrorKind::BadRequest,
                server_message.unwrap_or_else(|| BAD_REQUEST.to_owned()),
            ),
            ErrorKind::Status(404) => {
                (ChatErrorKind::NotFound, NOT_FOUND.to_owned())
            }
            ErrorKind::Status(status) if status >= 500 => {
                (ChatErrorKind::Server, SERVER_ERROR.to_owned())
            }
            ErrorKind::Status(_) => (
                ChatErrorKind::Other,
                server_message.unwrap_or_else(|| GENERIC.to_owned()),
            ),
            ErrorKind::MalformedResponse => (
                ChatErrorKind::MalformedResponse,
                MALFORMED_RESPONSE.to_owned(),
            ),
            ErrorKind::Rejected => (
                ChatErrorKind::Other,
                server_message.unwrap_or_else(|| fallback.to_owned()),
            ),
            ErrorKind::Transport => (ChatErrorKind::Other, GENERIC.to_owned()),
        };

        Self {
            kind,
            message,
            source: Some(err),
        }
    }

    #[inline]
    pub(crate) fn stopped() -> Self {
        Self {
            kind: ChatErrorKind::Other,
            message: STOPPED.to_owned(),
            source: None,
        }
    }

    /// Returns the category of this error.
    #[inline]
    pub fn kind(&self) -> ChatErrorKind {
        self.kind
    }

    /// Returns the user-facing message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<InvalidMessage> for ChatError {
    #[inline]
    fn from(err: InvalidMessage) -> Self {
        Self {
            kind: ChatErrorKind::Validation,
            message: err.to_string(),
            source: None,
        }
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ChatError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeError {
        kind: ErrorKind,
        server_message: Option<&'static str>,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl StdError for FakeError {}

    impl BackendError for FakeError {
        fn kind(&self) -> ErrorKind {
            self.kind
        }

        fn server_message(&self) -> Option<&str> {
            self.server_message
        }
    }

    fn normalize(
        kind: ErrorKind,
        server_message: Option<&'static str>,
    ) -> ChatError {
        ChatError::from_backend(
            Box::new(FakeError {
                kind,
                server_message,
            }),
            "Failed to send message to Elevatr",
        )
    }

    #[test]
    fn test_status_vocabulary() {
        let err = normalize(ErrorKind::Status(429), Some("slow down"));
        assert_eq!(err.kind(), ChatErrorKind::RateLimited);
        assert_eq!(err.message(), RATE_LIMITED);

        let err = normalize(ErrorKind::Status(404), Some("no such chat"));
        assert_eq!(err.kind(), ChatErrorKind::NotFound);
        assert_eq!(err.message(), NOT_FOUND);

        for status in [500, 502, 503] {
            let err = normalize(ErrorKind::Status(status), None);
            assert_eq!(err.kind(), ChatErrorKind::Server);
            assert_eq!(err.message(), SERVER_ERROR);
        }
    }

    #[test]
    fn test_bad_request_prefers_server_message() {
        let err =
            normalize(ErrorKind::Status(400), Some("Message is required"));
        assert_eq!(err.kind(), ChatErrorKind::BadRequest);
        assert_eq!(err.to_string(), "Message is required");

        let err = normalize(ErrorKind::Status(400), Some("   "));
        assert_eq!(err.to_string(), BAD_REQUEST);
    }

    #[test]
    fn test_other_failures() {
        let err = normalize(ErrorKind::Transport, None);
        assert_eq!(err.kind(), ChatErrorKind::Other);
        assert_eq!(err.message(), GENERIC);

        let err = normalize(ErrorKind::Status(418), None);
        assert_eq!(err.message(), GENERIC);

        let err = normalize(ErrorKind::MalformedResponse, None);
        assert_eq!(err.kind(), ChatErrorKind::MalformedResponse);
        assert_eq!(err.message(), "Invalid response format from server");

        let err = normalize(ErrorKind::Rejected, None);
        assert_eq!(err.message(), "Failed to send message to Elevatr");
        let err = normalize(ErrorKind::Rejected, Some("Quota exceeded"));
        assert_eq!(err.message(), "Quota exceeded");
    }

    #[test]
    fn test_source() {
        let err = normalize(ErrorKind::Status(503), None);
        let source = err.source().unwrap();
        assert!(source.to_string().contains("Status(503)"));

        let err = ChatError::from(InvalidMessage::Empty);
        assert_eq!(err.kind(), ChatErrorKind::Validation);
        assert!(err.source().is_none());
    }
}
