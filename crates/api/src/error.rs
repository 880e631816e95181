use std::fmt::{self, Display};

/// The kind of error that a backend reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced a response (connection, DNS, TLS...).
    Transport,
    /// The server answered with a non-success HTTP status.
    Status(u16),
    /// The response body doesn't have the expected envelope shape.
    MalformedResponse,
    /// The server answered successfully but flagged `success: false`.
    Rejected,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Status(status) => write!(f, "HTTP status {status}"),
            ErrorKind::MalformedResponse => write!(f, "Malformed response"),
            ErrorKind::Rejected => write!(f, "Rejected by server"),
        }
    }
}
