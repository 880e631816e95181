//! Client configuration.

use elevatr_api::{Message, Role};

/// Id of the fixed greeting that opens every conversation.
pub const WELCOME_MESSAGE_ID: &str = "welcome-message";

const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_WELCOME_MESSAGE: &str = "Hey there! 👋 I'm Elevatr, Jorge \
    Ferrari Ce's personal AI assistant! I'm here to tell you all about \
    Jorge's amazing journey, skills, projects, and what makes him tick. \
    What would you like to know about this incredible human? 🌟\n\n\
    *(Você também pode perguntar em português)*";

/// Builder for [`ChatConfig`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatConfigBuilder {
    max_message_length: Option<usize>,
    default_temperature: Option<f64>,
    default_max_tokens: Option<u32>,
    welcome_message: Option<String>,
}

impl ChatConfigBuilder {
    /// Creates a builder with all values unset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum message length, in characters. `0` is ignored.
    #[inline]
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = Some(max).filter(|max| *max > 0);
        self
    }

    /// Sets the temperature used when a request doesn't specify one.
    /// Non-finite values are ignored.
    #[inline]
    pub fn with_default_temperature(mut self, temperature: f64) -> Self {
        self.default_temperature = Some(temperature).filter(|t| t.is_finite());
        self
    }

    /// Sets the token limit used when a request doesn't specify one.
    #[inline]
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = Some(max_tokens);
        self
    }

    /// Sets the text of the greeting message.
    #[inline]
    pub fn with_welcome_message<S: Into<String>>(mut self, text: S) -> Self {
        self.welcome_message = Some(text.into());
        self
    }

    /// Builds the configuration, filling unset values with defaults.
    #[inline]
    pub fn build(self) -> ChatConfig {
        ChatConfig {
            max_message_length: self
                .max_message_length
                .unwrap_or(DEFAULT_MAX_MESSAGE_LENGTH),
            default_temperature: self
                .default_temperature
                .unwrap_or(DEFAULT_TEMPERATURE),
            default_max_tokens: self
                .default_max_tokens
                .unwrap_or(DEFAULT_MAX_TOKENS),
            welcome_message: self
                .welcome_message
                .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_owned()),
        }
    }
}

/// Configuration of a chat controller.
///
/// The configuration is built once at startup and handed to the
/// controller, which never changes it afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatConfig {
    max_message_length: usize,
    default_temperature: f64,
    default_max_tokens: u32,
    welcome_message: String,
}

impl ChatConfig {
    /// Returns the maximum message length, in characters.
    #[inline]
    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Returns the default sampling temperature.
    #[inline]
    pub fn default_temperature(&self) -> f64 {
        self.default_temperature
    }

    /// Returns the default token limit.
    #[inline]
    pub fn default_max_tokens(&self) -> u32 {
        self.default_max_tokens
    }

    /// Creates the greeting message.
    #[inline]
    pub fn welcome_message(&self) -> Message {
        Message::with_id(
            WELCOME_MESSAGE_ID,
            Role::Assistant,
            self.welcome_message.clone(),
        )
    }

    /// Resolves per-call options against the defaults.
    #[inline]
    pub(crate) fn resolve(&self, options: &ChatOptions) -> (f64, u32) {
        (
            options.temperature.unwrap_or(self.default_temperature),
            options.max_tokens.unwrap_or(self.default_max_tokens),
        )
    }
}

impl Default for ChatConfig {
    #[inline]
    fn default() -> Self {
        ChatConfigBuilder::new().build()
    }
}

/// Per-call overrides of the request options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature, the configured default when `None`.
    pub temperature: Option<f64>,
    /// Token limit, the configured default when `None`.
    pub max_tokens: Option<u32>,
}

impl ChatOptions {
    /// Overrides the temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Overrides the token limit.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.max_message_length(), 4000);
        assert_eq!(config.default_temperature(), 0.7);
        assert_eq!(config.default_max_tokens(), 1000);

        let welcome = config.welcome_message();
        assert_eq!(welcome.id, WELCOME_MESSAGE_ID);
        assert_eq!(welcome.role, Role::Assistant);
        assert!(welcome.content.starts_with("Hey there!"));
    }

    #[test]
    fn test_ignored_values() {
        let config = ChatConfigBuilder::new()
            .with_max_message_length(0)
            .with_default_temperature(f64::NAN)
            .build();
        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn test_resolve_options() {
        let config = ChatConfigBuilder::new()
            .with_default_temperature(0.3)
            .with_default_max_tokens(256)
            .build();
        assert_eq!(config.resolve(&ChatOptions::default()), (0.3, 256));

        // An explicit zero is a real value, not a request for the default.
        let options = ChatOptions::default().with_temperature(0.0);
        assert_eq!(config.resolve(&options), (0.0, 256));
        let options = ChatOptions::default().with_max_tokens(10);
        assert_eq!(config.resolve(&options), (0.3, 10));
    }
}
