//! Common imports for typical studio usage.
pub use crate::{
    ContentId, GenerationRequest, GenerationResult, HistoryTurn, MediaRef, ModelTier,
    ResponseEnvelope, Studio, StudioBuilder, StudioConfig, StudioError, TaskKind,
    init_observability,
};
