//! Routing: classify, pick a backend, assemble its payload, and normalize
//! the result.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{ImageAdapter, TextAdapter, VideoAdapter};
use crate::assembler::{
    AdapterPayload, context_media, image_payload, media_kinds, text_payload, video_payload,
};
use crate::backend::{ImageBackend, TextBackend, VideoBackend};
use crate::classifier::Classifier;
use crate::config::{BackendConfig, StudioConfig};
use crate::content::{MediaKind, MediaRef};
use crate::errors::StudioError;
use crate::model::{CatalogEntry, TaskKind};
use crate::request::GenerationRequest;
use crate::result::GenerationResult;
use crate::retry::with_retry;

/// Phrases (English and Danish) that ask for a transparent or removed
/// background. Matched case-insensitively as substrings, so this is a
/// heuristic that misses paraphrases.
pub const TRANSPARENCY_KEYWORDS: &[&str] = &[
    "transparent",
    "transparency",
    "remove background",
    "remove the background",
    "background removal",
    "no background",
    "without background",
    "without a background",
    "cut out",
    "gennemsigtig",
    "transparens",
    "fjern baggrund",
    "fjern baggrunden",
    "uden baggrund",
    "fritlæg",
];

/// Replaces the user's prompt when a transparent background is requested.
///
/// Image models cannot emit an alpha channel, so the subject is isolated on a
/// flat color that can be keyed out afterwards.
pub const ISOLATION_INSTRUCTION: &str = "Isolate the main subject of this image and place it on a \
single solid, uniform background color that contrasts with the subject. Keep the subject \
unchanged with clean, sharp edges and do not add shadows or any other objects.";

/// Returns true when the prompt asks for a transparent background.
pub fn wants_transparency(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    TRANSPARENCY_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Outcome of the routing policy for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteDecision {
    /// Capability that will serve the request.
    pub task: TaskKind,
    /// Model and label that will be reported with the result.
    pub entry: CatalogEntry,
    /// Text sent to the backend; the prompt unless substituted.
    pub instruction: String,
    /// Whether the transparency instruction replaced the prompt.
    pub transparency: bool,
    pub config: BackendConfig,
}

/// Applies the routing policy. Video beats image, image beats text.
///
/// `attachments` is the full context media (explicit attachments plus any
/// resolved `context_ref`).
pub fn decide_route(
    classified: TaskKind,
    attachments: &[MediaRef],
    prompt: &str,
    config: &StudioConfig,
) -> RouteDecision {
    let has_kind = |kind: MediaKind| attachments.iter().any(|m| m.kind() == kind);
    let catalog = &config.catalog;

    if classified == TaskKind::VideoGeneration || has_kind(MediaKind::Video) {
        return RouteDecision {
            task: TaskKind::VideoGeneration,
            entry: catalog.video.clone(),
            instruction: prompt.to_string(),
            transparency: false,
            config: BackendConfig::Video(config.video.clone()),
        };
    }

    if classified == TaskKind::ImageGeneration || has_kind(MediaKind::Image) {
        if attachments.is_empty() {
            return RouteDecision {
                task: TaskKind::ImageGeneration,
                entry: catalog.text_to_image.clone(),
                instruction: prompt.to_string(),
                transparency: false,
                config: BackendConfig::Image(config.image.clone()),
            };
        }
        let transparency = wants_transparency(prompt);
        let instruction = if transparency {
            ISOLATION_INSTRUCTION.to_string()
        } else {
            prompt.to_string()
        };
        return RouteDecision {
            task: TaskKind::ImageGeneration,
            entry: catalog.image_edit.clone(),
            instruction,
            transparency,
            config: BackendConfig::Image(config.image.clone()),
        };
    }

    RouteDecision {
        task: TaskKind::TextGeneration,
        entry: catalog.text.clone(),
        instruction: prompt.to_string(),
        transparency: false,
        config: BackendConfig::Text(config.text.clone()),
    }
}

/// Builds the payload for the adapter chosen by `decision`.
pub fn assemble(
    decision: &RouteDecision,
    request: &GenerationRequest,
    media: &[MediaRef],
) -> AdapterPayload {
    match decision.task {
        TaskKind::TextGeneration => {
            AdapterPayload::Text(text_payload(&request.history, &decision.instruction))
        }
        TaskKind::ImageGeneration => {
            AdapterPayload::Image(image_payload(&decision.instruction, media))
        }
        TaskKind::VideoGeneration => {
            AdapterPayload::Video(video_payload(&decision.instruction, media))
        }
    }
}

/// Routes requests to the text, image, or video backend.
#[derive(Clone)]
pub struct Router {
    classifier: Arc<dyn Classifier>,
    text: TextAdapter,
    image: ImageAdapter,
    video: VideoAdapter,
    config: StudioConfig,
}

impl Router {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        text: Arc<dyn TextBackend>,
        image: Arc<dyn ImageBackend>,
        video: Arc<dyn VideoBackend>,
        config: StudioConfig,
    ) -> Self {
        Self {
            classifier,
            text: TextAdapter::new(text),
            image: ImageAdapter::new(image),
            video: VideoAdapter::new(video),
            config,
        }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Classifies, dispatches, and wraps the output with the serving model.
    ///
    /// Backend failures come back as `StudioError::Backend` naming that
    /// model. Transient failures of the dispatch call are retried according
    /// to the configured policy; classification is not.
    pub async fn route(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, StudioError> {
        request.validate()?;
        let media = context_media(request)?;
        let classified = self.classify(&request.prompt_text, &media).await;
        let decision = decide_route(classified, &media, &request.prompt_text, &self.config);
        info!(
            event = "route.decided",
            domain = "route",
            classified = classified.as_str(),
            task = decision.task.as_str(),
            model = decision.entry.model.as_str(),
            attachments = media.len() as u64,
            transparency = decision.transparency
        );

        if decision.task == TaskKind::TextGeneration {
            if decision.instruction.trim().is_empty() {
                return Err(StudioError::Validation(
                    "attachments of this type need a prompt".into(),
                ));
            }
            if !media.is_empty() {
                warn!(
                    event = "route.attachments_ignored",
                    domain = "route",
                    attachments = media.len() as u64,
                    "text generation does not use attachments"
                );
            }
        }

        let payload = assemble(&decision, request, &media);
        let (decision, payload) = (&decision, &payload);
        with_retry(&self.config.retry, move |_attempt| self.dispatch(decision, payload)).await
    }

    async fn classify(&self, prompt: &str, media: &[MediaRef]) -> TaskKind {
        match self.classifier.classify(prompt, &media_kinds(media)).await {
            Ok(task) => task,
            Err(err) => {
                warn!(
                    event = "classify.fallback",
                    domain = "classify",
                    error = %err,
                    "classification failed, defaulting to text generation"
                );
                TaskKind::TextGeneration
            }
        }
    }

    async fn dispatch(
        &self,
        decision: &RouteDecision,
        payload: &AdapterPayload,
    ) -> Result<GenerationResult, StudioError> {
        let entry = &decision.entry;
        let wrap = |err| StudioError::backend(&entry.label, &entry.model, err);
        match (payload, &decision.config) {
            (AdapterPayload::Text(payload), BackendConfig::Text(config)) => self
                .text
                .generate(payload, &entry.model, config)
                .await
                .map(|text| GenerationResult::text(entry, text))
                .map_err(wrap),
            (AdapterPayload::Image(payload), BackendConfig::Image(config)) => self
                .image
                .generate(payload, &entry.model, config)
                .await
                .map(|image| GenerationResult::image(entry, image))
                .map_err(wrap),
            (AdapterPayload::Video(payload), BackendConfig::Video(config)) => self
                .video
                .generate(payload, &entry.model, config)
                .await
                .map(|video| GenerationResult::video(entry, video))
                .map_err(wrap),
            _ => Err(StudioError::Internal(format!(
                "payload does not match backend config for {}",
                decision.task
            ))),
        }
    }
}
