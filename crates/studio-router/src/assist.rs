//! Prompts and reply parsing for the small helper flows around a
//! conversation: titles, starter suggestions, and sentiment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classifier::extract_json_object;
use crate::content::{Message, Role};

pub const TITLE_MAX_WORDS: usize = 4;
pub const SUGGESTION_COUNT: usize = 3;

/// Model family a user has selected, used to tailor starter prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelTier {
    Pro,
    Flash,
    #[serde(rename = "Flash-Lite")]
    FlashLite,
    Image,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pro => "Pro",
            Self::Flash => "Flash",
            Self::FlashLite => "Flash-Lite",
            Self::Image => "Image",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "pro" => Ok(Self::Pro),
            "flash" => Ok(Self::Flash),
            "flashlite" => Ok(Self::FlashLite),
            "image" => Ok(Self::Image),
            _ => Err(format!("unknown model tier: {s:?}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" | "mixed" => Ok(Self::Neutral),
            other => Err(format!("unknown sentiment: {other:?}")),
        }
    }
}

/// Sentiment of a text, with `score` in `[-1, 1]` (negative to positive).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub score: f32,
}

pub(crate) fn title_messages(prompt: &str) -> Vec<Message> {
    vec![Message::text(
        Role::User,
        format!(
            "Generate a short, descriptive title (at most {TITLE_MAX_WORDS} words) for a \
             conversation that starts with the following prompt. Use the language of the \
             prompt and reply with the title only.\n\n{}",
            prompt.trim()
        ),
    )]
}

/// Strips quotes and trims the reply to the title word limit.
pub fn clean_title(reply: &str) -> String {
    let unquoted: String = reply
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”' | '«' | '»'))
        .collect();
    unquoted
        .split_whitespace()
        .take(TITLE_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn suggestion_messages(tier: ModelTier) -> Vec<Message> {
    vec![Message::text(
        Role::User,
        format!(
            "You are an expert prompt writer for Gemini models.\n\n\
             Based on the model type, provide {SUGGESTION_COUNT} diverse example prompts a user \
             can start from. Tailor them to the model type, make them creative, and make them \
             very different from each other.\n\n\
             Model type: {tier}\n\n\
             Respond with a JSON array of strings."
        ),
    )]
}

/// Reads a JSON array of strings from the reply, keeping at most
/// `SUGGESTION_COUNT` non-empty entries.
pub fn parse_suggestions(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let items: Vec<String> = serde_json::from_str(&reply[start..=end]).ok()?;
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(SUGGESTION_COUNT)
        .collect();
    (!items.is_empty()).then_some(items)
}

pub(crate) fn sentiment_messages(text: &str) -> Vec<Message> {
    vec![Message::text(
        Role::User,
        format!(
            "Analyze the sentiment of the following text:\n\n{}\n\n\
             Determine whether the sentiment is positive, negative, or neutral. Also provide a \
             numerical score from -1 (negative) to 1 (positive) indicating its strength.\n\n\
             Respond with JSON only: \
             {{\"sentiment\": \"positive|negative|neutral\", \"score\": <number>}}",
            text.trim()
        ),
    )]
}

/// Reads `{"sentiment": ..., "score": ...}` from the reply. The score is
/// clamped to `[-1, 1]`.
pub fn parse_sentiment(reply: &str) -> Option<Sentiment> {
    let value = extract_json_object(reply)?;
    let label = value
        .get("sentiment")
        .or_else(|| value.get("label"))
        .and_then(|v| v.as_str())?
        .parse()
        .ok()?;
    let score = value.get("score").and_then(|v| v.as_f64())?;
    if !score.is_finite() {
        return None;
    }
    Some(Sentiment {
        label,
        score: score.clamp(-1.0, 1.0) as f32,
    })
}
