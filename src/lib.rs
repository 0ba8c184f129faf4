//! Distance Matrix Kernel - pairwise distances as false-color images
//!
//! Provides:
//! - Distance measures (Euclidean, cross-correlation, Pearson)
//! - Parallel triangular matrix construction
//! - Fixed 256-entry colormaps and quantization
//! - Order-aware rendering and overlays (cluster strip, scores, markers)

pub mod colormap;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod matrix;
pub mod measure;
pub mod overlay;
pub mod render;

#[cfg(feature = "python")]
mod bindings;

pub use config::EngineConfig;
pub use engine::{Engine, Rebuild, RenderJob};
pub use error::{EngineError, Result};
pub use matrix::DistanceMatrix;
pub use measure::DistanceMeasure;
pub use render::Order;
