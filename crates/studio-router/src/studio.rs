use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt as _;
use tracing::{Instrument as _, error, info, info_span};

use crate::assist::{
    self, ModelTier, Sentiment, clean_title, parse_sentiment, parse_suggestions,
};
use crate::backend::{ImageBackend, TextBackend, VideoBackend};
use crate::classifier::{Classifier, KeywordClassifier, ModelClassifier};
use crate::config::{ClassifierMode, StudioConfig, TextConfig};
use crate::content::{MediaRef, Message};
use crate::errors::{BackendError, StudioError};
use crate::request::{GenerationRequest, HistoryTurn};
use crate::result::{GenerationResult, ResponseEnvelope};
use crate::retry::with_retry;
use crate::router::Router;
use crate::vendors::gemini::GeminiClient;

struct StudioInner {
    router: Router,
    text: Arc<dyn TextBackend>,
}

/// Entry point: routes prompts to text, image, or video generation and runs
/// the helper flows (titles, suggestions, sentiment).
#[derive(Clone)]
pub struct Studio {
    inner: Arc<StudioInner>,
}

impl Studio {
    /// Starts a builder for registering backends and creating a `Studio`.
    pub fn builder() -> StudioBuilder {
        StudioBuilder::default()
    }

    /// Builds a Gemini-backed studio from `GEMINI_API_KEY` and `STUDIO_*`
    /// overrides.
    pub fn from_env() -> Result<Self, StudioError> {
        Self::builder()
            .config(StudioConfig::from_env()?)
            .gemini(Arc::new(GeminiClient::from_env()?))
            .build()
    }

    pub fn config(&self) -> &StudioConfig {
        self.inner.router.config()
    }

    /// Routes one request and returns the normalized result.
    ///
    /// Each call runs in its own span carrying a fresh `request_id`.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, StudioError> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("generate", request_id = %request_id);
        async {
            let result = self.inner.router.route(&request).await;
            match &result {
                Ok(output) => info!(
                    event = "generate.completed",
                    domain = "route",
                    task = output.kind().as_str(),
                    model = output.model()
                ),
                Err(err) => error!(
                    event = "generate.failed",
                    domain = "route",
                    kind = ?err.kind(),
                    error = %err
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Boundary call that never fails: any error, including a panic inside
    /// the pipeline, becomes `ResponseEnvelope::Error`.
    pub async fn generate_response(
        &self,
        prompt: impl Into<String>,
        attachments: Vec<MediaRef>,
        history: Vec<HistoryTurn>,
    ) -> ResponseEnvelope {
        let request = GenerationRequest::new(prompt)
            .attachments(attachments)
            .history(history);
        self.respond(request).await
    }

    /// Same as `generate_response` for a prepared request.
    pub async fn respond(&self, request: GenerationRequest) -> ResponseEnvelope {
        match AssertUnwindSafe(self.generate(request)).catch_unwind().await {
            Ok(Ok(result)) => ResponseEnvelope::Data(result),
            Ok(Err(err)) => ResponseEnvelope::Error(err.user_message()),
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(event = "generate.panicked", domain = "route", detail = %detail);
                ResponseEnvelope::Error(
                    StudioError::Internal("generation failed unexpectedly".into()).user_message(),
                )
            }
        }
    }

    /// Short title (at most four words) for a conversation starting with
    /// `prompt`.
    pub async fn conversation_title(&self, prompt: &str) -> Result<String, StudioError> {
        if prompt.trim().is_empty() {
            return Err(StudioError::Validation("prompt must not be empty".into()));
        }
        let config = TextConfig::default().temperature(0.3);
        let reply = self
            .ask_text(assist::title_messages(prompt), &config)
            .await?;
        let title = clean_title(&reply);
        if title.is_empty() {
            return Err(self.unparseable("empty title reply"));
        }
        Ok(title)
    }

    /// Three starter prompts tailored to a model tier.
    pub async fn prompt_suggestions(&self, tier: ModelTier) -> Result<Vec<String>, StudioError> {
        let reply = self
            .ask_text(assist::suggestion_messages(tier), &TextConfig::default())
            .await?;
        parse_suggestions(&reply)
            .ok_or_else(|| self.unparseable("suggestions reply is not a JSON array"))
    }

    pub async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment, StudioError> {
        if text.trim().is_empty() {
            return Err(StudioError::Validation("text must not be empty".into()));
        }
        let reply = self
            .ask_text(assist::sentiment_messages(text), &TextConfig::default())
            .await?;
        parse_sentiment(&reply).ok_or_else(|| self.unparseable("sentiment reply is not valid JSON"))
    }

    async fn ask_text(
        &self,
        messages: Vec<Message>,
        config: &TextConfig,
    ) -> Result<String, StudioError> {
        let entry = &self.config().catalog.text;
        let messages = &messages;
        let text = &self.inner.text;
        with_retry(&self.config().retry, move |_attempt| async move {
            text.generate_text(&entry.model, messages, config)
                .await
                .map_err(|err| StudioError::backend(&entry.label, &entry.model, err))
        })
        .await
    }

    fn unparseable(&self, message: &str) -> StudioError {
        let entry = &self.config().catalog.text;
        StudioError::backend(
            &entry.label,
            &entry.model,
            BackendError::protocol(self.inner.text.id(), message),
        )
    }
}

/// Builder used to register backends before creating a `Studio`.
#[derive(Default)]
pub struct StudioBuilder {
    text: Option<Arc<dyn TextBackend>>,
    image: Option<Arc<dyn ImageBackend>>,
    video: Option<Arc<dyn VideoBackend>>,
    classifier: Option<Arc<dyn Classifier>>,
    config: StudioConfig,
}

impl StudioBuilder {
    pub fn text(mut self, backend: Arc<dyn TextBackend>) -> Self {
        self.text = Some(backend);
        self
    }

    pub fn image(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.image = Some(backend);
        self
    }

    pub fn video(mut self, backend: Arc<dyn VideoBackend>) -> Self {
        self.video = Some(backend);
        self
    }

    /// Registers one Gemini client for all three capabilities.
    pub fn gemini(self, client: Arc<GeminiClient>) -> Self {
        self.text(client.clone()).image(client.clone()).video(client)
    }

    /// Overrides the classifier chosen by `StudioConfig::classifier`.
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(mut self, config: StudioConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the studio; every capability needs a backend.
    pub fn build(self) -> Result<Studio, StudioError> {
        let missing = |name: &str| StudioError::Config(format!("no {name} backend registered"));
        let text = self.text.ok_or_else(|| missing("text"))?;
        let image = self.image.ok_or_else(|| missing("image"))?;
        let video = self.video.ok_or_else(|| missing("video"))?;
        let classifier: Arc<dyn Classifier> = match (self.classifier, self.config.classifier) {
            (Some(classifier), _) => classifier,
            (None, ClassifierMode::Model) => Arc::new(ModelClassifier::new(
                text.clone(),
                self.config.catalog.classifier.model.clone(),
            )),
            (None, ClassifierMode::Keywords) => Arc::new(KeywordClassifier),
        };
        let router = Router::new(classifier, text.clone(), image, video, self.config);
        Ok(Studio {
            inner: Arc::new(StudioInner { router, text }),
        })
    }
}
