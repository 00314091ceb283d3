use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::StudioError;
use crate::model::ModelCatalog;
use crate::retry::RetryPolicy;

/// Options for a text generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

impl TextConfig {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(text.into());
        self
    }
}

/// One safety category threshold forwarded to the image backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Output modalities requested from an image-editing model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Image,
}

/// Options for an image generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_safety_settings")]
    pub safety_settings: Vec<SafetySetting>,
    #[serde(default = "default_response_modalities")]
    pub response_modalities: Vec<ResponseModality>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            safety_settings: default_safety_settings(),
            response_modalities: default_response_modalities(),
        }
    }
}

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting::new(category, "BLOCK_ONLY_HIGH"))
    .collect()
}

fn default_response_modalities() -> Vec<ResponseModality> {
    vec![ResponseModality::Text, ResponseModality::Image]
}

/// Options for a video generation call and its polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u32,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// Delay between operation status checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound on the total time spent polling one operation.
    #[serde(default = "default_max_poll_ms")]
    pub max_poll_ms: u64,
}

const fn default_duration_seconds() -> u32 {
    5
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    5_000
}

const fn default_max_poll_ms() -> u64 {
    10 * 60 * 1_000
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration_seconds(),
            aspect_ratio: default_aspect_ratio(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_ms: default_max_poll_ms(),
        }
    }
}

impl VideoConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_poll_duration(&self) -> Duration {
        Duration::from_millis(self.max_poll_ms)
    }
}

/// Strongly shaped per-backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendConfig {
    Text(TextConfig),
    Image(ImageConfig),
    Video(VideoConfig),
}

/// How prompts are classified before routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// Ask the classifier model.
    #[default]
    Model,
    /// Match fixed drawing/animation cue lists locally.
    Keywords,
}

/// Complete studio configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub catalog: ModelCatalog,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub classifier: ClassifierMode,
}

impl StudioConfig {
    /// Builds the default config and applies `STUDIO_*` environment overrides.
    ///
    /// Environment variables:
    /// - `STUDIO_TEXT_MODEL`, `STUDIO_CLASSIFIER_MODEL`, `STUDIO_IMAGE_MODEL`,
    ///   `STUDIO_IMAGE_EDIT_MODEL`, `STUDIO_VIDEO_MODEL`: model overrides.
    /// - `STUDIO_CLASSIFIER`: `model` or `keywords`.
    /// - `STUDIO_MAX_ATTEMPTS`, `STUDIO_RETRY_DELAY_MS`: retry policy.
    /// - `STUDIO_VIDEO_POLL_INTERVAL_MS`, `STUDIO_VIDEO_MAX_POLL_MS`: video polling.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StudioError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(model) = get("STUDIO_TEXT_MODEL") {
            config.catalog.text.model = model;
        }
        if let Some(model) = get("STUDIO_CLASSIFIER_MODEL") {
            config.catalog.classifier.model = model;
        }
        if let Some(model) = get("STUDIO_IMAGE_MODEL") {
            config.catalog.text_to_image.model = model;
        }
        if let Some(model) = get("STUDIO_IMAGE_EDIT_MODEL") {
            config.catalog.image_edit.model = model;
        }
        if let Some(model) = get("STUDIO_VIDEO_MODEL") {
            config.catalog.video.model = model;
        }
        if let Some(mode) = get("STUDIO_CLASSIFIER") {
            config.classifier = match mode.to_ascii_lowercase().as_str() {
                "model" => ClassifierMode::Model,
                "keywords" => ClassifierMode::Keywords,
                other => {
                    return Err(StudioError::Config(format!(
                        "STUDIO_CLASSIFIER must be `model` or `keywords`, got {other:?}"
                    )));
                }
            };
        }
        if let Some(value) = get("STUDIO_MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_number("STUDIO_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = get("STUDIO_RETRY_DELAY_MS") {
            config.retry.base_delay_ms = parse_number("STUDIO_RETRY_DELAY_MS", &value)?;
        }
        if let Some(value) = get("STUDIO_VIDEO_POLL_INTERVAL_MS") {
            config.video.poll_interval_ms = parse_number("STUDIO_VIDEO_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = get("STUDIO_VIDEO_MAX_POLL_MS") {
            config.video.max_poll_ms = parse_number("STUDIO_VIDEO_MAX_POLL_MS", &value)?;
        }
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StudioError> {
    value
        .parse()
        .map_err(|_| StudioError::Config(format!("{key} must be a number, got {value:?}")))
}
