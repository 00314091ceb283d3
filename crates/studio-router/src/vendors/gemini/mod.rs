//! Gemini integration: one HTTP client serving text, image, and video models.
//!
//! Vendor-specific configuration lives here so the routing layer stays
//! backend-agnostic.
mod client;
mod config;
pub(crate) mod transport;

pub use client::GeminiClient;
pub use config::GeminiClientConfig;
