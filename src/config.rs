//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::colormap::{DegenerateRangePolicy, Palette, Rgba};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for build/render; None uses rayon's default.
    pub threads: Option<usize>,
    /// Palette for the matrix image
    pub palette: Palette,
    pub degenerate_range: DegenerateRangePolicy,
    /// Strip color for entities in more than one cluster
    pub ambiguous_color: Rgba,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: None,
            palette: Palette::Magma,
            degenerate_range: DegenerateRangePolicy::Floor,
            ambiguous_color: Rgba::WHITE,
        }
    }
}
