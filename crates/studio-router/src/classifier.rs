use std::sync::Arc;

use tracing::debug;

use crate::backend::TextBackend;
use crate::config::TextConfig;
use crate::content::{MediaKind, Message, Role};
use crate::errors::BackendError;
use crate::model::TaskKind;

/// Decides which capability a prompt asks for.
///
/// Attachment kinds are passed for context; the router applies its own
/// attachment rules on top of whatever is returned here.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        prompt: &str,
        attachment_kinds: &[MediaKind],
    ) -> Result<TaskKind, BackendError>;
}

const CLASSIFIER_INSTRUCTION: &str = r#"Analyze the following user prompt and classify the primary task.

User Prompt: "{prompt}"

- If the prompt explicitly asks to "draw", "create an image", "generate a picture", "make an illustration", "lav en illustration", or contains a detailed visual description for an image, classify it as 'image_generation'.
- If the prompt explicitly asks to "animate", "create a video", "make it move", or similar animation commands, classify it as 'video_generation'.
- For all other queries, including questions, requests for information, code, or general conversation, classify it as 'text_generation'.

Respond with only the classification in JSON format: {"task": "<classification>"}"#;

/// Classifies by asking a language model with a fixed instruction.
pub struct ModelClassifier {
    backend: Arc<dyn TextBackend>,
    model: String,
}

impl ModelClassifier {
    pub fn new(backend: Arc<dyn TextBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl Classifier for ModelClassifier {
    async fn classify(
        &self,
        prompt: &str,
        attachment_kinds: &[MediaKind],
    ) -> Result<TaskKind, BackendError> {
        if prompt.trim().is_empty() {
            return Ok(TaskKind::TextGeneration);
        }
        let instruction = CLASSIFIER_INSTRUCTION.replace("{prompt}", prompt.trim());
        let messages = [Message::text(Role::User, instruction)];
        let config = TextConfig::default().temperature(0.0);
        let reply = self
            .backend
            .generate_text(&self.model, &messages, &config)
            .await?;
        debug!(
            event = "classify.reply",
            domain = "classify",
            model = self.model.as_str(),
            attachments = attachment_kinds.len() as u64,
            reply_len = reply.len() as u64
        );
        parse_classification(&reply).ok_or_else(|| {
            BackendError::protocol(
                self.backend.id(),
                format!("unparseable classification reply: {}", truncate(&reply, 120)),
            )
        })
    }
}

/// Extracts a task from `{"task": "..."}` (optionally fenced) or a bare token.
pub fn parse_classification(reply: &str) -> Option<TaskKind> {
    let trimmed = reply.trim();
    if let Some(value) = extract_json_object(trimmed)
        && let Some(task) = value.get("task").and_then(|v| v.as_str())
    {
        return task.parse().ok();
    }
    trimmed
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c.is_whitespace())
        .parse()
        .ok()
}

pub(crate) fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

const IMAGE_CUES: &[&str] = &[
    "draw",
    "create an image",
    "generate an image",
    "generate a picture",
    "make a picture",
    "make an image",
    "illustration",
    "illustrate",
    "paint",
    "sketch",
    "tegn",
    "lav et billede",
    "generer et billede",
    "lav en illustration",
];

const VIDEO_CUES: &[&str] = &[
    "animate",
    "animation",
    "create a video",
    "make a video",
    "generate a video",
    "make it move",
    "animer",
    "lav en video",
    "få det til at bevæge sig",
];

/// Matches the same intents as `ModelClassifier` with fixed cue lists.
///
/// Video cues win over image cues, mirroring the router's priority.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn classify_text(prompt: &str) -> TaskKind {
        let lower = prompt.to_lowercase();
        if VIDEO_CUES.iter().any(|cue| lower.contains(cue)) {
            TaskKind::VideoGeneration
        } else if IMAGE_CUES.iter().any(|cue| lower.contains(cue)) {
            TaskKind::ImageGeneration
        } else {
            TaskKind::TextGeneration
        }
    }
}

#[async_trait::async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(
        &self,
        prompt: &str,
        _attachment_kinds: &[MediaKind],
    ) -> Result<TaskKind, BackendError> {
        Ok(Self::classify_text(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeText;

    #[test]
    fn parses_json_fenced_and_bare_replies() {
        assert_eq!(
            parse_classification(r#"{"task": "image_generation"}"#),
            Some(TaskKind::ImageGeneration)
        );
        assert_eq!(
            parse_classification("```json\n{\"task\":\"video_generation\"}\n```"),
            Some(TaskKind::VideoGeneration)
        );
        assert_eq!(
            parse_classification(" 'text_generation' "),
            Some(TaskKind::TextGeneration)
        );
        assert_eq!(parse_classification("I think you want a picture"), None);
        assert_eq!(parse_classification(r#"{"task": "poetry"}"#), None);
    }

    #[test]
    fn keyword_classifier_detects_intents() {
        assert_eq!(
            KeywordClassifier::classify_text("Draw a cat on a beach"),
            TaskKind::ImageGeneration
        );
        assert_eq!(
            KeywordClassifier::classify_text("Tegn en labrador i en solnedgang"),
            TaskKind::ImageGeneration
        );
        assert_eq!(
            KeywordClassifier::classify_text("animate this drawing"),
            TaskKind::VideoGeneration
        );
        assert_eq!(
            KeywordClassifier::classify_text("What is the capital of Denmark?"),
            TaskKind::TextGeneration
        );
    }

    #[tokio::test]
    async fn model_classifier_sends_prompt_in_instruction() {
        let backend = FakeText::replying(vec![Ok(r#"{"task":"image_generation"}"#.into())]);
        let classifier = ModelClassifier::new(backend.clone(), "classifier-model");
        let task = classifier
            .classify("draw a cat on a beach", &[])
            .await
            .expect("classify");
        assert_eq!(task, TaskKind::ImageGeneration);

        let calls = backend.calls.lock().expect("lock");
        assert_eq!(calls[0].0, "classifier-model");
        let sent = calls[0].1[0].parts[0].as_text().unwrap_or_default().to_string();
        assert!(sent.contains("User Prompt: \"draw a cat on a beach\""));
        assert_eq!(calls[0].2.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn model_classifier_reports_unparseable_reply() {
        let backend = FakeText::replying(vec![Ok("maybe an image?".into())]);
        let err = ModelClassifier::new(backend, "m")
            .classify("hmm", &[])
            .await
            .expect_err("unparseable");
        assert!(matches!(err, BackendError::Protocol { .. }));
    }

    #[tokio::test]
    async fn empty_prompt_skips_model_call() {
        let backend = FakeText::replying(vec![]);
        let task = ModelClassifier::new(backend.clone(), "m")
            .classify("  ", &[MediaKind::Image])
            .await
            .expect("classify");
        assert_eq!(task, TaskKind::TextGeneration);
        assert_eq!(backend.call_count(), 0);
    }
}
