//! Error type shared by every eraser module.

use crate::scene::ObjectId;

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

#[derive(Debug, thiserror::Error)]
pub enum EraseError {
    #[error("empty stroke: {points} point(s) after decimation")]
    EmptyStroke { points: usize },
    #[error("transform is not invertible (determinant {det})")]
    NonInvertible { det: f64 },
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("surface allocation failed: {width}x{height}")]
    SurfaceAlloc { width: u32, height: u32 },
    #[error("render failed: {0}")]
    Render(String),
    #[error("invalid brush config: {0}")]
    Config(String),
    #[error("path projection failed: {0}")]
    Projection(String),
}

impl EraseError {
    /// Stable machine-readable code for hosts that surface diagnostics.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyStroke { .. } => "E_EMPTY_STROKE",
            Self::NonInvertible { .. } => "E_NON_INVERTIBLE",
            Self::ObjectNotFound(_) => "E_OBJECT_NOT_FOUND",
            Self::SurfaceAlloc { .. } => "E_SURFACE_ALLOC",
            Self::Render(_) => "E_RENDER",
            Self::Config(_) => "E_CONFIG",
            Self::Projection(_) => "E_PROJECTION",
        }
    }
}
