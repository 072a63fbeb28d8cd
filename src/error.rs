//! Error taxonomy
//!
//! Only configuration and geometry mistakes surface as errors. Degenerate frames
//! and exhausted spawn retries are recovered where they happen, and a collision is
//! a tick outcome rather than an error.

use thiserror::Error;

/// Why a tube build was rejected
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeometryFault {
    #[error("tube cross-section needs at least 3 sides, got {0}")]
    TooFewSides(u32),
    #[error("outer radius must be positive and finite, got {0}")]
    NonPositiveRadius(f32),
    #[error("tube needs at least 3 tubular segments, got {0}")]
    TooFewSegments(u32),
}

/// Errors reported by the engine and its collaborators
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryFault),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
