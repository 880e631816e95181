//! Client-side message validation.

use std::error::Error;
use std::fmt::{self, Display};

/// Reasons a message is refused before it reaches the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidMessage {
    /// The message is empty or only whitespace.
    Empty,
    /// The message is longer than the configured maximum.
    TooLong {
        /// The maximum length in characters.
        max: usize,
    },
}

impl Display for InvalidMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMessage::Empty => write!(f, "Message cannot be empty"),
            InvalidMessage::TooLong { max } => write!(
                f,
                "Message too long. Maximum {max} characters allowed."
            ),
        }
    }
}

impl Error for InvalidMessage {}

/// Checks that `text` can be sent.
///
/// Length is measured in characters, not bytes.
pub fn validate_message(
    text: &str,
    max_len: usize,
) -> Result<(), InvalidMessage> {
    if text.trim().is_empty() {
        return Err(InvalidMessage::Empty);
    }
    if text.chars().count() > max_len {
        return Err(InvalidMessage::TooLong { max: max_len });
    }
    Ok(())
}
