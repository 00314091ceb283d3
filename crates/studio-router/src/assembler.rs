//! Builds the exact payload each adapter receives.

use std::collections::HashSet;

use tracing::warn;

use crate::content::{ContentId, InputPart, MediaKind, MediaRef, Message, Role};
use crate::errors::StudioError;
use crate::request::{GenerationRequest, HistoryTurn, Speaker};

const EMPTY_TURN_MARKER: &str = "[empty]";

/// Role-tagged conversation for the text adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPayload {
    pub messages: Vec<Message>,
}

/// Ordered prompt parts for the image adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePayload {
    pub parts: Vec<InputPart>,
}

/// Prompt plus at most one base media item for the video adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoPayload {
    pub prompt: String,
    pub base: Option<MediaRef>,
    /// Attachments beyond the first, which the video backend cannot use.
    pub dropped_attachments: usize,
}

/// Payload for whichever adapter the router selected.
#[derive(Clone, Debug, PartialEq)]
pub enum AdapterPayload {
    Text(TextPayload),
    Image(ImagePayload),
    Video(VideoPayload),
}

/// Converts history plus the new prompt into role-tagged messages.
///
/// Turns keep their exact order; nothing is merged or deduplicated.
pub fn text_payload(history: &[HistoryTurn], prompt: &str) -> TextPayload {
    let mut messages = Vec::with_capacity(history.len() + 1);
    for turn in history {
        let role = match turn.speaker {
            Speaker::User => Role::User,
            Speaker::Assistant => Role::Model,
        };
        messages.push(Message::text(role, turn_text(turn)));
    }
    messages.push(Message::text(Role::User, prompt));
    TextPayload { messages }
}

// Turns without text get a marker like `[image]`, or `[empty]` when they
// carry nothing at all; every message needs one non-empty part.
fn turn_text(turn: &HistoryTurn) -> String {
    if !turn.text.trim().is_empty() {
        return turn.text.clone();
    }
    if turn.media.is_empty() {
        return EMPTY_TURN_MARKER.to_string();
    }
    let kinds: Vec<&str> = turn.media.iter().map(|m| m.kind().as_str()).collect();
    format!("[{}]", kinds.join(", "))
}

/// Instruction text first, then one part per attachment in supplied order.
pub fn image_payload(instruction: &str, attachments: &[MediaRef]) -> ImagePayload {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    parts.push(InputPart::Text(instruction.to_string()));
    parts.extend(attachments.iter().cloned().map(InputPart::Media));
    ImagePayload { parts }
}

/// Text plus the first attachment only.
pub fn video_payload(prompt: &str, attachments: &[MediaRef]) -> VideoPayload {
    let dropped = attachments.len().saturating_sub(1);
    if dropped > 0 {
        warn!(
            event = "assemble.video_attachments_dropped",
            domain = "assemble",
            supplied = attachments.len() as u64,
            dropped = dropped as u64,
            "video generation uses only the first attachment"
        );
    }
    VideoPayload {
        prompt: prompt.to_string(),
        base: attachments.first().cloned(),
        dropped_attachments: dropped,
    }
}

/// Media the request should carry: explicit attachments, then whatever
/// `context_ref` points at in history, deduplicated by content identity.
pub fn context_media(request: &GenerationRequest) -> Result<Vec<MediaRef>, StudioError> {
    let mut candidates: Vec<MediaRef> = request.attachments.clone();
    if let Some(id) = &request.context_ref {
        let resolved = resolve_context_ref(&request.history, id).ok_or_else(|| {
            StudioError::Validation(format!("context reference {id} not found in history"))
        })?;
        candidates.push(resolved);
    }
    Ok(dedup_by_content(candidates))
}

/// Finds media with the given identity anywhere in history.
///
/// The same bytes may be stored as an assistant output and as a later user
/// upload; either copy is equivalent.
pub fn resolve_context_ref(history: &[HistoryTurn], id: &ContentId) -> Option<MediaRef> {
    history
        .iter()
        .flat_map(|turn| turn.media.iter())
        .find(|media| &media.content_id() == id)
        .cloned()
}

/// Keeps the first occurrence of each `ContentId`, preserving order.
pub fn dedup_by_content(media: impl IntoIterator<Item = MediaRef>) -> Vec<MediaRef> {
    let mut seen: HashSet<ContentId> = HashSet::new();
    media
        .into_iter()
        .filter(|item| seen.insert(item.content_id()))
        .collect()
}

/// Media kinds in order, for the classifier.
pub fn media_kinds(media: &[MediaRef]) -> Vec<MediaKind> {
    media.iter().map(MediaRef::kind).collect()
}
