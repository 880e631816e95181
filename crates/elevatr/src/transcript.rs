use elevatr_api::Message;

/// Tracks which messages have been printed, so that only the changes of
/// each state are rendered.
#[derive(Debug, Default)]
pub struct Transcript {
    shown: Vec<String>,
}

impl Transcript {
    /// Forgets everything printed so far.
    #[inline]
    pub fn reset(&mut self) {
        self.shown.clear();
    }

    /// Records `messages` as printed and returns the ones to print now.
    ///
    /// Appended user messages are skipped since the user just typed them.
    /// A history that doesn't extend the printed one is printed in full,
    /// unless it's a prefix of it, which happens when a send is rolled
    /// back.
    pub fn update<'a>(&mut self, messages: &'a [Message]) -> Vec<&'a Message> {
        let common = self
            .shown
            .iter()
            .zip(messages)
            .take_while(|(id, message)| **id == message.id)
            .count();

        let to_print = if common == self.shown.len() {
            messages[common..].iter().filter(|m| !m.is_user()).collect()
        } else if common == messages.len() {
            Vec::new()
        } else {
            messages.iter().collect()
        };

        self.shown = messages.iter().map(|m| m.id.clone()).collect();
        to_print
    }
}
