//! Error types for the distance matrix engine.

use thiserror::Error;

use crate::measure::DistanceMeasure;

/// Every failure aborts the current build/render call; no partial output escapes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Feature vectors of unequal length
    #[error("feature vector {entity} has length {found}, expected {expected}")]
    DimensionMismatch {
        entity: usize,
        expected: usize,
        found: usize,
    },

    /// Zero-norm (or zero-variance) vector fed to a correlation-family measure
    #[error("entity {entity} is degenerate under {measure}")]
    DegenerateInput {
        measure: DistanceMeasure,
        entity: usize,
    },

    /// Quantization range collapsed to a point
    #[error("degenerate quantization range [{lo}, {hi}]")]
    DegenerateRange { lo: f32, hi: f32 },

    /// Order references an index >= N
    #[error("order index {index} out of range for {len} entities")]
    IndexOutOfRange { index: usize, len: usize },

    /// Order omits an index (and therefore repeats another)
    #[error("order omits index {index} of {len}")]
    MissingIndex { index: usize, len: usize },

    /// Per-entity input whose length differs from the matrix size
    #[error("{what} has length {found}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("no distance matrix has been built yet")]
    NoMatrix,

    #[error("thread pool: {0}")]
    ThreadPool(String),
}

impl From<rayon::ThreadPoolBuildError> for EngineError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        EngineError::ThreadPool(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
