use crate::content::{ContentId, MediaRef};
use crate::errors::StudioError;

/// Who produced a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One prior turn of a conversation, oldest first.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryTurn {
    pub speaker: Speaker,
    #[serde(default)]
    pub text: String,
    /// User uploads or assistant outputs attached to this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
    /// Media this turn continued from, recorded when the turn was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_ref: Option<ContentId>,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            media: Vec::new(),
            context_ref: None,
        }
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_context_ref(mut self, id: ContentId) -> Self {
        self.context_ref = Some(id);
        self
    }
}

/// Input to a single routing pass.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt_text: String,
    #[serde(default)]
    pub attachments: Vec<MediaRef>,
    /// Prior turns, excluding the turn this request represents.
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    /// Media from `history` to reuse as context (for example an earlier
    /// generated image to keep editing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_ref: Option<ContentId>,
}

impl GenerationRequest {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            ..Self::default()
        }
    }

    pub fn attachment(mut self, media: MediaRef) -> Self {
        self.attachments.push(media);
        self
    }

    pub fn attachments(mut self, media: impl IntoIterator<Item = MediaRef>) -> Self {
        self.attachments.extend(media);
        self
    }

    pub fn history(mut self, turns: Vec<HistoryTurn>) -> Self {
        self.history = turns;
        self
    }

    pub fn context_ref(mut self, id: ContentId) -> Self {
        self.context_ref = Some(id);
        self
    }

    /// Splits a full thread into history plus the new request.
    ///
    /// The last turn must be a user turn; its text, media, and `context_ref`
    /// become the request and every earlier turn becomes history.
    pub fn from_thread(mut turns: Vec<HistoryTurn>) -> Result<Self, StudioError> {
        let last = turns
            .pop()
            .ok_or_else(|| StudioError::Validation("conversation thread is empty".into()))?;
        if last.speaker != Speaker::User {
            return Err(StudioError::Validation(
                "the most recent turn must come from the user".into(),
            ));
        }
        Ok(Self {
            prompt_text: last.text,
            attachments: last.media,
            history: turns,
            context_ref: last.context_ref,
        })
    }

    /// Checks input invariants before anything is dispatched.
    pub fn validate(&self) -> Result<(), StudioError> {
        let has_media = !self.attachments.is_empty() || self.context_ref.is_some();
        if self.prompt_text.trim().is_empty() && !has_media {
            return Err(StudioError::Validation(
                "prompt must not be empty unless media is attached".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(byte: u8) -> MediaRef {
        MediaRef::new("image/png", vec![byte]).expect("media")
    }

    #[test]
    fn empty_prompt_requires_media() {
        assert!(matches!(
            GenerationRequest::new("   ").validate(),
            Err(StudioError::Validation(_))
        ));
        assert!(GenerationRequest::new("").attachment(png(1)).validate().is_ok());
        assert!(
            GenerationRequest::new("")
                .context_ref(png(1).content_id())
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn from_thread_excludes_latest_turn_from_history() {
        let image = png(7);
        let request = GenerationRequest::from_thread(vec![
            HistoryTurn::user("hello"),
            HistoryTurn::assistant("hi"),
            HistoryTurn::user("use this")
                .with_media(image.clone())
                .with_context_ref(image.content_id()),
        ])
        .expect("request");
        assert_eq!(request.prompt_text, "use this");
        assert_eq!(request.attachments, vec![image.clone()]);
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.context_ref, Some(image.content_id()));
    }

    #[test]
    fn from_thread_rejects_assistant_tail() {
        let err = GenerationRequest::from_thread(vec![HistoryTurn::assistant("done")])
            .expect_err("should fail");
        assert!(matches!(err, StudioError::Validation(_)));
        assert!(GenerationRequest::from_thread(Vec::new()).is_err());
    }

    #[test]
    fn history_turn_deserializes_with_defaults() {
        let turn: HistoryTurn =
            serde_json::from_value(serde_json::json!({"speaker": "assistant"})).expect("turn");
        assert_eq!(turn.speaker, Speaker::Assistant);
        assert!(turn.text.is_empty());
        assert!(turn.media.is_empty());
    }
}
