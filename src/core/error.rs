//! Error taxonomy for the control core.
//!
//! Precondition violations (degenerate polygons, malformed snapshot sections)
//! fail fast where they are detected. Replay desynchronization is fatal.
//! Out-of-range light writes are not errors at all; see `LightField::set_intensity`.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, PushError>;

#[derive(Debug, Error)]
pub enum PushError {
    /// A polygon needs at least three vertices before any containment or area query.
    #[error("polygon has {vertices} vertices, at least 3 are required")]
    DegeneratePolygon { vertices: usize },

    /// Centroid requested on a polygon whose signed area is zero.
    #[error("polygon has zero signed area")]
    DegenerateArea,

    #[error("malformed snapshot at line {line}: {reason}")]
    MalformedSnapshot { line: usize, reason: String },

    #[error("malformed polygon definition at line {line}: {reason}")]
    MalformedPolygon { line: usize, reason: String },

    #[error("invalid header flags: {0}")]
    InvalidHeader(String),

    /// A loaded snapshot does not describe the live world.
    #[error("replay mismatch: snapshot has {found} {what}, world has {expected}")]
    ReplayMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
