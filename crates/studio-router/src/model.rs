use std::fmt;
use std::str::FromStr;

/// Stable identifier for a backend implementation (for example `gemini`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BackendId(pub String);

impl BackendId {
    /// Creates a backend id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the backend id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Task category inferred for a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TextGeneration,
    ImageGeneration,
    VideoGeneration,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextGeneration => "text_generation",
            Self::ImageGeneration => "image_generation",
            Self::VideoGeneration => "video_generation",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text_generation" => Ok(Self::TextGeneration),
            "image_generation" => Ok(Self::ImageGeneration),
            "video_generation" => Ok(Self::VideoGeneration),
            other => Err(format!("unknown task classification: {other:?}")),
        }
    }
}

/// A backend model plus the label shown next to its output.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatalogEntry {
    /// Backend model name (for example `veo-2.0-generate-001`).
    pub model: String,
    /// Human-readable label (for example `Veo`).
    pub label: String,
}

impl CatalogEntry {
    pub fn new(model: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            label: label.into(),
        }
    }
}

/// Models used for each capability.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelCatalog {
    /// Conversational text model.
    pub text: CatalogEntry,
    /// Model used to classify prompts.
    pub classifier: CatalogEntry,
    /// Text-to-image model, used when no attachments are present.
    pub text_to_image: CatalogEntry,
    /// Image-editing (image-to-image) model, used with attachments.
    pub image_edit: CatalogEntry,
    /// Video model (long-running operations).
    pub video: CatalogEntry,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            text: CatalogEntry::new("gemini-2.5-flash", "Gemini Flash"),
            classifier: CatalogEntry::new("gemini-2.5-flash", "Gemini Flash"),
            text_to_image: CatalogEntry::new("imagen-4.0-fast-generate-001", "Imagen"),
            image_edit: CatalogEntry::new("gemini-2.5-flash-image-preview", "Gemini Flash Image"),
            video: CatalogEntry::new("veo-2.0-generate-001", "Veo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_kind_parses_wire_names() {
        assert_eq!(
            "image_generation".parse::<TaskKind>(),
            Ok(TaskKind::ImageGeneration)
        );
        assert_eq!(
            " Video_Generation ".parse::<TaskKind>(),
            Ok(TaskKind::VideoGeneration)
        );
        assert!("draw".parse::<TaskKind>().is_err());
        assert_eq!(
            serde_json::to_value(TaskKind::TextGeneration).expect("json"),
            serde_json::json!("text_generation")
        );
    }

    #[test]
    fn default_catalog_uses_distinct_image_backends() {
        let catalog = ModelCatalog::default();
        assert_ne!(catalog.text_to_image.model, catalog.image_edit.model);
        assert_eq!(catalog.video.label, "Veo");
    }
}
