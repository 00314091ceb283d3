use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Errors raised while building or decoding a `MediaRef`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// The MIME type is empty or not of the `type/subtype` form.
    #[error("invalid MIME type: {0:?}")]
    InvalidMimeType(String),
    /// The string is not a `data:<mime>;base64,<payload>` URI.
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),
    /// The base64 payload could not be decoded.
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// Coarse media category derived from a MIME type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Classifies a MIME type by its top-level type.
    pub fn from_mime(mime_type: &str) -> Self {
        let top = mime_type
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match top.as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "media",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content identity of a media payload (hex SHA-256 of the bytes).
///
/// Two `MediaRef`s with the same bytes share a `ContentId` regardless of where
/// they were found in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Computes the identity of a payload.
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }
}

/// Binary media payload tagged with its MIME type.
///
/// Serializes as a self-describing data URI (`data:<mime>;base64,<payload>`) so
/// media produced in one turn can be submitted again as context in a later one.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaRef {
    mime_type: String,
    data: Bytes,
}

impl MediaRef {
    /// Creates a media reference after validating the MIME type.
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Result<Self, MediaError> {
        let mime_type = normalize_mime(&mime_type.into())?;
        Ok(Self {
            mime_type,
            data: data.into(),
        })
    }

    /// Decodes a raw base64 payload (as returned inline by backends).
    pub fn from_base64(mime_type: impl Into<String>, payload: &str) -> Result<Self, MediaError> {
        let data = BASE64
            .decode(payload.trim().as_bytes())
            .map_err(|e| MediaError::Base64(e.to_string()))?;
        Self::new(mime_type, data)
    }

    /// Parses a `data:<mime>[;param...];base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, MediaError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| MediaError::InvalidDataUri("missing `data:` scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MediaError::InvalidDataUri("missing `,` separator".into()))?;
        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(MediaError::InvalidDataUri(
                "only base64-encoded data URIs are supported".into(),
            ));
        }
        Self::from_base64(mime, payload)
    }

    /// Encodes the media as a data URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }

    /// Returns the base64 payload without the data URI header.
    pub fn base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    /// Content identity used for deduplication and `context_ref` lookups.
    pub fn content_id(&self) -> ContentId {
        ContentId::of(&self.data)
    }
}

impl fmt::Debug for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRef")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FromStr for MediaRef {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_data_uri(s)
    }
}

impl TryFrom<String> for MediaRef {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_uri(&value)
    }
}

impl From<MediaRef> for String {
    fn from(value: MediaRef) -> Self {
        value.to_data_uri()
    }
}

fn normalize_mime(raw: &str) -> Result<String, MediaError> {
    let mime = raw.trim().to_ascii_lowercase();
    match mime.split_once('/') {
        Some((top, sub))
            if !top.is_empty() && !sub.is_empty() && !mime.contains(char::is_whitespace) =>
        {
            Ok(mime)
        }
        _ => Err(MediaError::InvalidMimeType(raw.to_string())),
    }
}

/// One part of a multi-part prompt.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum InputPart {
    /// Plain text.
    Text(String),
    /// Inline media (image or video).
    Media(MediaRef),
}

impl InputPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Media(_) => None,
        }
    }
}

/// Backend-facing conversation role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// Role-tagged message sent to a text backend.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<InputPart>,
}

impl Message {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![InputPart::Text(text.into())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_round_trip_keeps_mime_and_bytes() {
        let media = MediaRef::new("image/png", vec![0x89, 0x50, 0x4e, 0x47]).expect("media");
        let uri = media.to_data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let parsed: MediaRef = uri.parse().expect("parse");
        assert_eq!(parsed, media);
        assert_eq!(parsed.kind(), MediaKind::Image);
    }

    #[test]
    fn data_uri_accepts_extra_params_and_normalizes_mime() {
        let media =
            MediaRef::from_data_uri("data:Video/MP4;codecs=avc1;base64,AAEC").expect("parse");
        assert_eq!(media.mime_type(), "video/mp4");
        assert_eq!(&media.data()[..], &[0u8, 1, 2]);
        assert_eq!(media.kind(), MediaKind::Video);
    }

    #[test]
    fn rejects_non_base64_and_malformed_uris() {
        assert!(matches!(
            MediaRef::from_data_uri("data:text/plain,hello"),
            Err(MediaError::InvalidDataUri(_))
        ));
        assert!(matches!(
            MediaRef::from_data_uri("https://example.com/cat.png"),
            Err(MediaError::InvalidDataUri(_))
        ));
        assert!(matches!(
            MediaRef::from_data_uri("data:image/png;base64,@@@"),
            Err(MediaError::Base64(_))
        ));
        assert!(matches!(
            MediaRef::new("png", vec![1]),
            Err(MediaError::InvalidMimeType(_))
        ));
    }

    #[test]
    fn content_id_depends_on_bytes_only() {
        let a = MediaRef::new("image/png", vec![1, 2, 3]).expect("a");
        let b = MediaRef::new("image/jpeg", vec![1, 2, 3]).expect("b");
        let c = MediaRef::new("image/png", vec![3, 2, 1]).expect("c");
        assert_eq!(a.content_id(), b.content_id());
        assert_ne!(a.content_id(), c.content_id());
        assert_eq!(a.content_id().as_str().len(), 64);
    }

    #[test]
    fn media_ref_serializes_as_data_uri_string() {
        let media = MediaRef::new("image/webp", vec![9, 9]).expect("media");
        let value = serde_json::to_value(&media).expect("serialize");
        assert_eq!(value, serde_json::json!("data:image/webp;base64,CQk="));
        let back: MediaRef = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, media);
    }
}
