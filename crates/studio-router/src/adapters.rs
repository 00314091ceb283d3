//! Capability adapters: one uniform `generate` call per backend kind.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::assembler::{ImagePayload, TextPayload, VideoPayload};
use crate::backend::{ImageBackend, ImageOutput, LongRunningOperation, TextBackend, VideoBackend};
use crate::config::{ImageConfig, TextConfig, VideoConfig};
use crate::content::MediaRef;
use crate::errors::BackendError;

/// Single synchronous text call.
#[derive(Clone)]
pub struct TextAdapter {
    backend: Arc<dyn TextBackend>,
}

impl TextAdapter {
    pub fn new(backend: Arc<dyn TextBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        payload: &TextPayload,
        model: &str,
        config: &TextConfig,
    ) -> Result<String, BackendError> {
        self.backend
            .generate_text(model, &payload.messages, config)
            .await
    }
}

/// Single synchronous image call that must yield media.
#[derive(Clone)]
pub struct ImageAdapter {
    backend: Arc<dyn ImageBackend>,
}

impl ImageAdapter {
    pub fn new(backend: Arc<dyn ImageBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        payload: &ImagePayload,
        model: &str,
        config: &ImageConfig,
    ) -> Result<MediaRef, BackendError> {
        match self
            .backend
            .generate_image(model, &payload.parts, config)
            .await?
        {
            ImageOutput::Media(media) => Ok(media),
            ImageOutput::Empty { reason } => Err(BackendError::no_media(
                self.backend.id(),
                reason.unwrap_or_else(|| "response contained no image".to_string()),
            )),
        }
    }
}

/// Phases of one video generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoPhase {
    Submitted,
    Polling,
    Completed,
    Failed,
}

impl VideoPhase {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Submits a long-running video job, polls it on a fixed interval within a
/// bounded budget, and downloads the result.
///
/// The remote operation is never cancelled: dropping the future stops polling
/// but the backend keeps working (and billing) server-side.
#[derive(Clone)]
pub struct VideoAdapter {
    backend: Arc<dyn VideoBackend>,
}

impl VideoAdapter {
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(
        &self,
        payload: &VideoPayload,
        model: &str,
        config: &VideoConfig,
    ) -> Result<MediaRef, BackendError> {
        let backend_id = self.backend.id();
        let mut operation = self
            .backend
            .submit_video(model, &payload.prompt, payload.base.as_ref(), config)
            .await?
            .ok_or_else(|| {
                BackendError::protocol(
                    backend_id.clone(),
                    "video generation operation did not start",
                )
            })?;
        log_phase(VideoPhase::Submitted, &operation, 0);

        let started = Instant::now();
        let budget = config.max_poll_duration();
        let interval = config.poll_interval();
        let mut polls = 0u32;
        while !operation.done {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                log_phase(VideoPhase::Failed, &operation, polls);
                warn!(
                    event = "video.poll_timed_out",
                    domain = "video",
                    operation = %operation.id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    polls = polls
                );
                return Err(BackendError::OperationTimedOut {
                    backend: backend_id,
                    operation: operation.id,
                    elapsed,
                });
            }
            tokio::time::sleep(interval.min(budget - elapsed)).await;
            polls += 1;
            // Transient status failures keep polling the same job.
            match self.backend.check_operation(&operation).await {
                Ok(next) => operation = next,
                Err(err) if err.is_transient() => {
                    warn!(
                        event = "video.poll_retry",
                        domain = "video",
                        operation = %operation.id,
                        polls = polls,
                        error = %err
                    );
                    continue;
                }
                Err(err) => return Err(err),
            }
            log_phase(VideoPhase::Polling, &operation, polls);
        }

        if let Some(error) = operation.error.take() {
            log_phase(VideoPhase::Failed, &operation, polls);
            return Err(BackendError::OperationFailed {
                backend: backend_id,
                operation: operation.id,
                message: error.message,
            });
        }
        let Some(output_ref) = operation.output_ref.as_deref() else {
            log_phase(VideoPhase::Failed, &operation, polls);
            return Err(BackendError::protocol(
                backend_id,
                format!("operation {} finished without a video", operation.id),
            ));
        };

        let media = self.backend.fetch_media(output_ref).await?;
        log_phase(VideoPhase::Completed, &operation, polls);
        info!(
            event = "video.completed",
            domain = "video",
            operation = %operation.id,
            polls = polls,
            bytes = media.data().len() as u64,
            mime_type = media.mime_type()
        );
        Ok(media)
    }
}

fn log_phase(phase: VideoPhase, operation: &LongRunningOperation, polls: u32) {
    debug!(
        event = "video.phase",
        domain = "video",
        phase = phase.as_str(),
        operation = %operation.id,
        done = operation.done,
        polls = polls
    );
}
