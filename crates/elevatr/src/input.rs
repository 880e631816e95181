use tokio::io::{AsyncBufRead, Lines};

/// Questions offered while the conversation only holds the greeting.
pub const SUGGESTIONS: [&str; 5] = [
    "What are Jorge's main skills?",
    "What's he into? Hobbies... Movies...?",
    "What are some of Jorge's accomplishments?",
    "Tell me about Jorge's coolest projects",
    "What makes Jorge unique as a developer?",
];

pub const HELP: &str = "\
/retry          send your last message again
/clear          start a new conversation
/load <id>      continue a conversation from the server
/delete [id]    delete a conversation, the current one by default
/stats          show counters of the current conversation
/help           show this help
/quit           leave";

/// One line typed by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    Message(String),
    /// A bare number, which picks a suggestion when they are shown.
    Pick(usize),
    Retry,
    Clear,
    Load(Option<String>),
    Delete(Option<String>),
    Stats,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    /// Parses a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(command) = line.strip_prefix('/') else {
            if let Ok(index) = line.parse::<usize>() {
                return Some(Input::Pick(index));
            }
            return Some(Input::Message(line.to_owned()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim().to_owned())),
            None => (command, None),
        };
        let input = match name {
            "retry" => Input::Retry,
            "clear" | "new" => Input::Clear,
            "load" => Input::Load(arg),
            "delete" => Input::Delete(arg),
            "stats" => Input::Stats,
            "help" | "?" => Input::Help,
            "quit" | "exit" => Input::Quit,
            _ => Input::Unknown(name.to_owned()),
        };
        Some(input)
    }
}

/// Resolves a picked number to its suggestion. Numbers start from 1.
#[inline]
pub fn suggestion(index: usize) -> Option<&'static str> {
    index.checked_sub(1).and_then(|i| SUGGESTIONS.get(i)).copied()
}

/// Returns `true` when `len` is past 80% of `max`.
#[inline]
pub fn is_near_limit(len: usize, max: usize) -> bool {
    len.saturating_mul(5) > max.saturating_mul(4)
}

/// Reads the next line, or `None` once the input is closed.
///
/// The reader outlives the call, so lines that arrived together (a paste)
/// are handed out one by one.
pub async fn next_line<R>(lines: &mut Lines<R>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncBufReadExt;

    use super::*;

    #[test]
    fn test_parse_messages() {
        assert_eq!(Input::parse("  \n"), None);
        assert_eq!(
            Input::parse("  Tell me about Jorge \n"),
            Some(Input::Message("Tell me about Jorge".to_owned()))
        );
        assert_eq!(Input::parse("3"), Some(Input::Pick(3)));
        assert_eq!(
            Input::parse("3 things"),
            Some(Input::Message("3 things".to_owned()))
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Input::parse("/retry"), Some(Input::Retry));
        assert_eq!(Input::parse("/clear"), Some(Input::Clear));
        assert_eq!(Input::parse("/load"), Some(Input::Load(None)));
        assert_eq!(
            Input::parse("/load   c42 "),
            Some(Input::Load(Some("c42".to_owned())))
        );
        assert_eq!(Input::parse("/delete"), Some(Input::Delete(None)));
        assert_eq!(
            Input::parse("/delete c1"),
            Some(Input::Delete(Some("c1".to_owned())))
        );
        assert_eq!(Input::parse("/quit"), Some(Input::Quit));
        assert_eq!(
            Input::parse("/dance now"),
            Some(Input::Unknown("dance".to_owned()))
        );
    }

    #[test]
    fn test_suggestion() {
        assert_eq!(suggestion(0), None);
        assert_eq!(suggestion(1), Some("What are Jorge's main skills?"));
        assert_eq!(suggestion(5), Some(SUGGESTIONS[4]));
        assert_eq!(suggestion(6), None);
    }

    #[test]
    fn test_near_limit() {
        assert!(!is_near_limit(3200, 4000));
        assert!(is_near_limit(3201, 4000));
        assert!(!is_near_limit(8, 10));
        assert!(is_near_limit(9, 10));
    }

    #[test]
    fn test_near_limit_huge_max() {
        assert!(!is_near_limit(10, usize::MAX / 2));
        assert!(!is_near_limit(10, usize::MAX));
        assert!(is_near_limit(usize::MAX / 4, usize::MAX / 5));
    }

    #[tokio::test]
    async fn test_pasted_lines() {
        let pasted: &[u8] = b"What are Jorge's main skills?\n/stats\n\n/quit";
        let mut lines = pasted.lines();

        let mut read = Vec::new();
        while let Some(line) = next_line(&mut lines).await {
            read.push(line);
        }
        assert_eq!(
            read,
            ["What are Jorge's main skills?", "/stats", "", "/quit"]
        );
        assert_eq!(Input::parse(&read[1]), Some(Input::Stats));
    }
}
