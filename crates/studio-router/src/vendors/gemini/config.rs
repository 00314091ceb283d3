use std::time::Duration;

use crate::errors::StudioError;

/// Configuration for the Gemini API client.
#[derive(Clone)]
pub struct GeminiClientConfig {
    /// API key sent as the `x-goog-api-key` header (and as `key=` on media
    /// downloads).
    pub api_key: String,
    /// Base URL for the Generative Language endpoint.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// API version path segment, for example `v1beta`.
    pub api_version: String,
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiClientConfig {
    /// Creates a config with sensible defaults and a provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_version: "v1beta".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`), with an
    /// optional `GEMINI_API_BASE` override.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StudioError> {
        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .into_iter()
            .filter_map(&lookup)
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                StudioError::Config("missing GEMINI_API_KEY for Gemini backend".into())
            })?;
        let mut config = Self::new(api_key.trim());
        if let Some(base) = lookup("GEMINI_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.base_url = base.trim().to_string();
        }
        Ok(config)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }

    pub(crate) fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.root())
    }

    pub(crate) fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}", self.root(), operation.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_base_and_version() {
        let config = GeminiClientConfig::new("k").base_url("http://localhost:8080/");
        assert_eq!(
            config.model_url("models/gemini-2.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            config.operation_url("models/veo-2.0-generate-001/operations/abc"),
            "http://localhost:8080/v1beta/models/veo-2.0-generate-001/operations/abc"
        );
    }

    #[test]
    fn env_lookup_falls_back_to_google_key() {
        let config = GeminiClientConfig::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("  ".into()),
            "GOOGLE_API_KEY" => Some("g-key".into()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.api_key, "g-key");
        assert!(!format!("{config:?}").contains("g-key"));

        let err = GeminiClientConfig::from_lookup(|_| None).expect_err("missing key");
        assert!(matches!(err, StudioError::Config(msg) if msg.contains("GEMINI_API_KEY")));
    }
}
