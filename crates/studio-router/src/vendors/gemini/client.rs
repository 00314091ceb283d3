use tracing::debug;

use crate::backend::{ImageBackend, ImageOutput, LongRunningOperation, TextBackend, VideoBackend};
use crate::config::{ImageConfig, TextConfig, VideoConfig};
use crate::content::{InputPart, MediaRef, Message};
use crate::errors::{BackendError, StudioError};
use crate::model::BackendId;

use super::config::GeminiClientConfig;
use super::transport::{
    edit_request_body, extract_imagen_prediction, extract_inline_image, extract_text,
    imagen_request_body, map_error_response, parse_operation, text_request_body,
    video_request_body, with_api_key,
};

const GEMINI_BACKEND: &str = "gemini";
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Client for the Gemini REST API covering text, image, and video models.
///
/// Build one per process and share it behind an `Arc`.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiClientConfig,
}

impl GeminiClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: GeminiClientConfig) -> Result<Self, StudioError> {
        if config.api_key.trim().is_empty() {
            return Err(StudioError::Config(
                "Gemini client config api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StudioError::Config(format!("failed to build Gemini client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client using `GEMINI_API_KEY` (or `GOOGLE_API_KEY`).
    pub fn from_env() -> Result<Self, StudioError> {
        Self::new(GeminiClientConfig::from_env()?)
    }

    fn backend_id() -> BackendId {
        BackendId::new(GEMINI_BACKEND)
    }

    async fn post_json(
        &self,
        url: String,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(Self::backend_id(), format!("Gemini request failed: {e}"))
            })?;
        read_json(response).await
    }

    async fn get_json(&self, url: String) -> Result<serde_json::Value, BackendError> {
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(Self::backend_id(), format!("Gemini request failed: {e}"))
            })?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, BackendError> {
    let backend = GeminiClient::backend_id();
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(map_error_response(&backend, status.as_u16(), &body));
    }
    response.json().await.map_err(|e| {
        BackendError::protocol(backend, format!("invalid Gemini response JSON: {e}"))
    })
}

fn is_imagen(model: &str) -> bool {
    model
        .strip_prefix("models/")
        .unwrap_or(model)
        .starts_with("imagen")
}

#[async_trait::async_trait]
impl TextBackend for GeminiClient {
    fn id(&self) -> BackendId {
        Self::backend_id()
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[Message],
        config: &TextConfig,
    ) -> Result<String, BackendError> {
        debug!(model, messages = messages.len() as u64, "gemini generateContent (text)");
        let body = text_request_body(messages, config);
        let value = self
            .post_json(self.config.model_url(model, "generateContent"), &body)
            .await?;
        extract_text(&Self::backend_id(), &value)
    }
}

#[async_trait::async_trait]
impl ImageBackend for GeminiClient {
    fn id(&self) -> BackendId {
        Self::backend_id()
    }

    /// Imagen models take the text parts as a single prompt; other models
    /// receive every part through `generateContent`.
    async fn generate_image(
        &self,
        model: &str,
        parts: &[InputPart],
        config: &ImageConfig,
    ) -> Result<ImageOutput, BackendError> {
        if is_imagen(model) {
            let prompt: Vec<&str> = parts.iter().filter_map(InputPart::as_text).collect();
            debug!(model, "imagen predict");
            let value = self
                .post_json(
                    self.config.model_url(model, "predict"),
                    &imagen_request_body(&prompt.join("\n")),
                )
                .await?;
            return extract_imagen_prediction(&Self::backend_id(), &value);
        }
        debug!(model, parts = parts.len() as u64, "gemini generateContent (image)");
        let value = self
            .post_json(
                self.config.model_url(model, "generateContent"),
                &edit_request_body(parts, config),
            )
            .await?;
        extract_inline_image(&Self::backend_id(), &value)
    }
}

#[async_trait::async_trait]
impl VideoBackend for GeminiClient {
    fn id(&self) -> BackendId {
        Self::backend_id()
    }

    async fn submit_video(
        &self,
        model: &str,
        prompt: &str,
        base: Option<&MediaRef>,
        config: &VideoConfig,
    ) -> Result<Option<LongRunningOperation>, BackendError> {
        let body = video_request_body(prompt, base, config);
        let value = self
            .post_json(self.config.model_url(model, "predictLongRunning"), &body)
            .await?;
        if value.get("name").is_none() {
            return Ok(None);
        }
        parse_operation(&Self::backend_id(), &value).map(Some)
    }

    async fn check_operation(
        &self,
        operation: &LongRunningOperation,
    ) -> Result<LongRunningOperation, BackendError> {
        let value = self
            .get_json(self.config.operation_url(&operation.id))
            .await?;
        parse_operation(&Self::backend_id(), &value)
    }

    async fn fetch_media(&self, output_ref: &str) -> Result<MediaRef, BackendError> {
        let backend = Self::backend_id();
        let response = self
            .client
            .get(with_api_key(output_ref, &self.config.api_key))
            .send()
            .await
            .map_err(|e| {
                BackendError::transport(backend.clone(), format!("video download failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::provider(
                backend,
                format!("video download failed with status {status}"),
                Some(status.as_u16()),
            ));
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.contains('/') && v != "application/octet-stream")
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());
        let bytes = response.bytes().await.map_err(|e| {
            BackendError::transport(backend.clone(), format!("video download read failed: {e}"))
        })?;
        MediaRef::new(mime, bytes)
            .map_err(|e| BackendError::protocol(backend, format!("invalid downloaded media: {e}")))
    }
}
