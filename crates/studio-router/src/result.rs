use serde::{Deserialize, Serialize};

use crate::content::MediaRef;
use crate::model::{CatalogEntry, TaskKind};

/// Normalized output of one routed request.
///
/// Media is serialized as a data URI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationResult {
    Text {
        model: String,
        label: String,
        text: String,
    },
    Image {
        model: String,
        label: String,
        image: MediaRef,
    },
    Video {
        model: String,
        label: String,
        video: MediaRef,
    },
}

impl GenerationResult {
    pub(crate) fn text(entry: &CatalogEntry, text: String) -> Self {
        Self::Text {
            model: entry.model.clone(),
            label: entry.label.clone(),
            text,
        }
    }

    pub(crate) fn image(entry: &CatalogEntry, image: MediaRef) -> Self {
        Self::Image {
            model: entry.model.clone(),
            label: entry.label.clone(),
            image,
        }
    }

    pub(crate) fn video(entry: &CatalogEntry, video: MediaRef) -> Self {
        Self::Video {
            model: entry.model.clone(),
            label: entry.label.clone(),
            video,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Text { model, .. } | Self::Image { model, .. } | Self::Video { model, .. } => {
                model
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Text { label, .. } | Self::Image { label, .. } | Self::Video { label, .. } => {
                label
            }
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Text { .. } => TaskKind::TextGeneration,
            Self::Image { .. } => TaskKind::ImageGeneration,
            Self::Video { .. } => TaskKind::VideoGeneration,
        }
    }

    /// Produced media, if any.
    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            Self::Text { .. } => None,
            Self::Image { image, .. } => Some(image),
            Self::Video { video, .. } => Some(video),
        }
    }
}

/// Outermost response shape: `{"data": ...}` or `{"error": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Data(GenerationResult),
    Error(String),
}

impl ResponseEnvelope {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
