//! Prompt router for a multimodal studio: each request is classified and sent
//! to a text, image, or video backend, with one normalized result shape.
//!
//! Backends are injected as trait objects; `vendors::gemini` provides a
//! Gemini/Imagen/Veo implementation of all three.
//!
//! # Usage (Gemini)
//!
//! ```no_run
//! use studio_router::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StudioError> {
//! init_observability();
//! let studio = Studio::from_env()?;
//!
//! let envelope = studio
//!     .generate_response("draw a cat on a beach", Vec::new(), Vec::new())
//!     .await;
//! println!("{}", serde_json::to_string(&envelope).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

/// Capability adapters (text, image, long-running video).
pub mod adapters;
/// Payload assembly from history, prompt, and attachments.
pub mod assembler;
/// Title, suggestion, and sentiment helper flows.
pub mod assist;
/// Backend contracts implemented by vendor integrations.
pub mod backend;
/// Prompt classification.
pub mod classifier;
/// Per-backend and studio-wide configuration.
pub mod config;
/// Media and message content types.
pub mod content;
/// Public error types and taxonomy.
pub mod errors;
/// Backend identifiers, task kinds, and the model catalog.
pub mod model;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Generation requests and conversation history.
pub mod request;
/// Normalized results and the response envelope.
pub mod result;
/// Retry policy for transient backend failures.
pub mod retry;
/// Routing policy and orchestration.
pub mod router;
/// `Studio` entry point and builder.
pub mod studio;
/// Vendor-specific integrations.
pub mod vendors;

#[cfg(test)]
mod fakes;

pub use assist::{ModelTier, Sentiment, SentimentLabel};
pub use backend::{ImageBackend, ImageOutput, LongRunningOperation, TextBackend, VideoBackend};
pub use classifier::{Classifier, KeywordClassifier, ModelClassifier};
pub use config::{BackendConfig, ClassifierMode, ImageConfig, StudioConfig, TextConfig, VideoConfig};
pub use content::{ContentId, InputPart, MediaError, MediaKind, MediaRef, Message, Role};
pub use errors::{BackendError, ErrorKind, StudioError};
pub use model::{BackendId, CatalogEntry, ModelCatalog, TaskKind};
pub use observability::init_observability;
pub use request::{GenerationRequest, HistoryTurn, Speaker};
pub use result::{GenerationResult, ResponseEnvelope};
pub use retry::{Backoff, RetryPolicy};
pub use router::{RouteDecision, Router, decide_route};
pub use studio::{Studio, StudioBuilder};
