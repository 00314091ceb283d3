//! Vendor integrations implementing the backend traits.

/// Google Gemini (text), Imagen and Gemini image models, and Veo video.
pub mod gemini;
