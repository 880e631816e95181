use std::env;
use std::str::FromStr;

use elevatr_core::{ChatConfig, ChatConfigBuilder};
use elevatr_http_backend::{HttpBackendConfig, HttpBackendConfigBuilder};

const BASE_URL_VAR: &str = "ELEVATR_API_BASE_URL";
const MAX_MESSAGE_LENGTH_VAR: &str = "ELEVATR_MAX_MESSAGE_LENGTH";
const TEMPERATURE_VAR: &str = "ELEVATR_DEFAULT_TEMPERATURE";
const MAX_TOKENS_VAR: &str = "ELEVATR_DEFAULT_MAX_TOKENS";

/// Everything the program reads from its environment.
#[derive(Debug)]
pub struct Settings {
    pub chat: ChatConfig,
    pub backend: HttpBackendConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the settings from `lookup`, which maps a variable name to its
    /// value. Unset, unparsable and zero values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut chat = ChatConfigBuilder::new();
        if let Some(max) = parse_var::<usize, _>(&lookup, MAX_MESSAGE_LENGTH_VAR)
        {
            chat = chat.with_max_message_length(max);
        }
        if let Some(temperature) = parse_var::<f64, _>(&lookup, TEMPERATURE_VAR)
            .filter(|t| *t != 0.0)
        {
            chat = chat.with_default_temperature(temperature);
        }
        if let Some(max_tokens) = parse_var::<u32, _>(&lookup, MAX_TOKENS_VAR)
            .filter(|n| *n > 0)
        {
            chat = chat.with_default_max_tokens(max_tokens);
        }

        let mut backend = HttpBackendConfigBuilder::new();
        if let Some(base_url) = lookup(BASE_URL_VAR) {
            backend = backend.with_base_url(base_url);
        }

        Self {
            chat: chat.build(),
            backend: backend.build(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring {name}={value:?}: not a valid value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = from_vars(&[]);
        assert_eq!(settings.chat.max_message_length(), 4000);
        assert_eq!(settings.chat.default_temperature(), 0.7);
        assert_eq!(settings.chat.default_max_tokens(), 1000);
        assert_eq!(settings.backend.base_url(), "http://localhost:3000/api");
    }

    #[test]
    fn test_overrides() {
        let settings = from_vars(&[
            ("ELEVATR_API_BASE_URL", "https://elevatr.example.com/api/"),
            ("ELEVATR_MAX_MESSAGE_LENGTH", "500"),
            ("ELEVATR_DEFAULT_TEMPERATURE", " 0.2 "),
            ("ELEVATR_DEFAULT_MAX_TOKENS", "256"),
        ]);
        assert_eq!(settings.chat.max_message_length(), 500);
        assert_eq!(settings.chat.default_temperature(), 0.2);
        assert_eq!(settings.chat.default_max_tokens(), 256);
        assert_eq!(
            settings.backend.base_url(),
            "https://elevatr.example.com/api"
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = from_vars(&[
            ("ELEVATR_MAX_MESSAGE_LENGTH", "lots"),
            ("ELEVATR_DEFAULT_TEMPERATURE", "0"),
            ("ELEVATR_DEFAULT_MAX_TOKENS", "-3"),
        ]);
        assert_eq!(settings.chat.max_message_length(), 4000);
        assert_eq!(settings.chat.default_temperature(), 0.7);
        assert_eq!(settings.chat.default_max_tokens(), 1000);

        let settings = from_vars(&[("ELEVATR_MAX_MESSAGE_LENGTH", "0")]);
        assert_eq!(settings.chat.max_message_length(), 4000);
    }
}
