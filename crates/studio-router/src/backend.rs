//! Contracts implemented by vendor integrations.
//!
//! Each trait wraps the raw remote calls for one capability. Higher-level
//! behavior (no-media detection, polling, retry) lives in `adapters` and
//! `retry`, so backends stay thin.

use crate::config::{ImageConfig, TextConfig, VideoConfig};
use crate::content::{InputPart, MediaRef, Message};
use crate::errors::BackendError;
use crate::model::BackendId;

#[async_trait::async_trait]
pub trait TextBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Generates a reply for role-tagged `messages`, the last one being the
    /// new user turn.
    async fn generate_text(
        &self,
        model: &str,
        messages: &[Message],
        config: &TextConfig,
    ) -> Result<String, BackendError>;
}

#[async_trait::async_trait]
pub trait ImageBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Generates one image. An answer without media is `ImageOutput::Empty`,
    /// not an error.
    async fn generate_image(
        &self,
        model: &str,
        parts: &[InputPart],
        config: &ImageConfig,
    ) -> Result<ImageOutput, BackendError>;
}

/// Raw image backend output.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageOutput {
    Media(MediaRef),
    /// No media in the response, with the backend's reason when available
    /// (finish reason, refusal text).
    Empty { reason: Option<String> },
}

#[async_trait::async_trait]
pub trait VideoBackend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Submits a video job. `Ok(None)` means the backend accepted the call but
    /// returned no operation handle.
    async fn submit_video(
        &self,
        model: &str,
        prompt: &str,
        base: Option<&MediaRef>,
        config: &VideoConfig,
    ) -> Result<Option<LongRunningOperation>, BackendError>;

    /// Refreshes the status of a submitted operation.
    async fn check_operation(
        &self,
        operation: &LongRunningOperation,
    ) -> Result<LongRunningOperation, BackendError>;

    /// Downloads the finished media referenced by an operation.
    async fn fetch_media(&self, output_ref: &str) -> Result<MediaRef, BackendError>;
}

/// Error payload reported by a finished operation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

/// Handle to an asynchronous backend job.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LongRunningOperation {
    pub id: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    /// Location of the finished media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<String>,
}

impl LongRunningOperation {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            done: false,
            error: None,
            output_ref: None,
        }
    }
}
