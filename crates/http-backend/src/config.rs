const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Builder for [`HttpBackendConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HttpBackendConfigBuilder {
    base_url: Option<String>,
}

impl HttpBackendConfigBuilder {
    /// Creates a builder with all values unset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the chat API, e.g. `https://host/api`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpBackendConfig {
        let base_url = self
            .base_url
            .map(|url| url.trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        HttpBackendConfig { base_url }
    }
}

/// Configuration for the HTTP chat backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HttpBackendConfig {
    pub(crate) base_url: String,
}

impl HttpBackendConfig {
    /// Returns the base URL requests are sent to.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for HttpBackendConfig {
    #[inline]
    fn default() -> Self {
        HttpBackendConfigBuilder::new().build()
    }
}
