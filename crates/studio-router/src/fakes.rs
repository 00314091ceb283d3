//! In-memory backends shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{ImageBackend, ImageOutput, LongRunningOperation, TextBackend, VideoBackend};
use crate::config::{ImageConfig, TextConfig, VideoConfig};
use crate::content::{InputPart, MediaRef, Message};
use crate::errors::BackendError;
use crate::model::BackendId;

pub(crate) fn png(byte: u8) -> MediaRef {
    MediaRef::new("image/png", vec![byte, byte, byte]).expect("png")
}

pub(crate) fn mp4(byte: u8) -> MediaRef {
    MediaRef::new("video/mp4", vec![byte; 4]).expect("mp4")
}

/// Text backend replaying scripted replies and recording every call.
#[derive(Default)]
pub(crate) struct FakeText {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    pub calls: Mutex<Vec<(String, Vec<Message>, TextConfig)>>,
}

impl FakeText {
    pub fn replying(replies: Vec<Result<String, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait::async_trait]
impl TextBackend for FakeText {
    fn id(&self) -> BackendId {
        BackendId::new("fake")
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[Message],
        config: &TextConfig,
    ) -> Result<String, BackendError> {
        self.calls
            .lock()
            .expect("lock")
            .push((model.to_string(), messages.to_vec(), config.clone()));
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// Image backend replaying scripted outputs.
pub(crate) struct FakeImage {
    outputs: Mutex<VecDeque<Result<ImageOutput, BackendError>>>,
    pub calls: Mutex<Vec<(String, Vec<InputPart>)>>,
}

impl FakeImage {
    pub fn replying(outputs: Vec<Result<ImageOutput, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait::async_trait]
impl ImageBackend for FakeImage {
    fn id(&self) -> BackendId {
        BackendId::new("fake")
    }

    async fn generate_image(
        &self,
        model: &str,
        parts: &[InputPart],
        _config: &ImageConfig,
    ) -> Result<ImageOutput, BackendError> {
        self.calls
            .lock()
            .expect("lock")
            .push((model.to_string(), parts.to_vec()));
        self.outputs
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok(ImageOutput::Media(png(200))))
    }
}

/// Video backend whose operation finishes after `polls_until_done` checks.
pub(crate) struct FakeVideo {
    pub polls_until_done: usize,
    /// Leading status checks that fail with a transient precondition error.
    pub flaky_checks: usize,
    pub start: Option<LongRunningOperation>,
    pub final_error: Option<crate::backend::OperationError>,
    pub fetch_result: Result<MediaRef, BackendError>,
    pub submits: Mutex<Vec<(String, String, Option<MediaRef>)>>,
    pub checks: AtomicUsize,
    pub fetches: Mutex<Vec<String>>,
}

impl FakeVideo {
    pub fn finishing_after(polls: usize) -> Self {
        Self {
            polls_until_done: polls,
            flaky_checks: 0,
            start: Some(LongRunningOperation::pending("operations/fake-1")),
            final_error: None,
            fetch_result: Ok(mp4(9)),
            submits: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VideoBackend for FakeVideo {
    fn id(&self) -> BackendId {
        BackendId::new("fake")
    }

    async fn submit_video(
        &self,
        model: &str,
        prompt: &str,
        base: Option<&MediaRef>,
        _config: &VideoConfig,
    ) -> Result<Option<LongRunningOperation>, BackendError> {
        self.submits
            .lock()
            .expect("lock")
            .push((model.to_string(), prompt.to_string(), base.cloned()));
        Ok(self.start.clone())
    }

    async fn check_operation(
        &self,
        operation: &LongRunningOperation,
    ) -> Result<LongRunningOperation, BackendError> {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.flaky_checks {
            return Err(BackendError::precondition_failed("fake", "FAILED_PRECONDITION"));
        }
        let n = n - self.flaky_checks;
        let mut next = operation.clone();
        if n >= self.polls_until_done {
            next.done = true;
            next.error = self.final_error.clone();
            if next.error.is_none() {
                next.output_ref = Some("https://files.example/video.mp4?alt=media".into());
            }
        }
        Ok(next)
    }

    async fn fetch_media(&self, output_ref: &str) -> Result<MediaRef, BackendError> {
        self.fetches
            .lock()
            .expect("lock")
            .push(output_ref.to_string());
        self.fetch_result.clone()
    }
}
