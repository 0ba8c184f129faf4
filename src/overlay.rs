//! Overlays: cluster membership strip, score strip and labeled markers
//!
//! Overlays depend only on the current [`Order`] and per-entity inputs,
//! never on the distance matrix.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::colormap::{Colormap, DegenerateRangePolicy, Quantizer, Rgb, Rgba};
use crate::error::{EngineError, Result};
use crate::render::Order;

pub type ClusterId = u32;

/// Cluster ids per entity, in original entity order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMembership {
    per_entity: Vec<BTreeSet<ClusterId>>,
}

impl ClusterMembership {
    pub fn new(per_entity: Vec<BTreeSet<ClusterId>>) -> Self {
        Self { per_entity }
    }

    /// Build from flat `(entity, cluster)` assignments over `n` entities.
    pub fn from_assignments(n: usize, assignments: &[(usize, ClusterId)]) -> Result<Self> {
        let mut per_entity = vec![BTreeSet::new(); n];
        for &(entity, cluster) in assignments {
            per_entity
                .get_mut(entity)
                .ok_or(EngineError::IndexOutOfRange { index: entity, len: n })?
                .insert(cluster);
        }
        Ok(Self { per_entity })
    }

    pub fn len(&self) -> usize {
        self.per_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_entity.is_empty()
    }

    pub fn clusters_of(&self, entity: usize) -> Option<&BTreeSet<ClusterId>> {
        self.per_entity.get(entity)
    }
}

const QUALITATIVE: [Rgb; 10] = [
    Rgb::new(31, 119, 180),
    Rgb::new(255, 127, 14),
    Rgb::new(44, 160, 44),
    Rgb::new(214, 39, 40),
    Rgb::new(148, 103, 189),
    Rgb::new(140, 86, 75),
    Rgb::new(227, 119, 194),
    Rgb::new(127, 127, 127),
    Rgb::new(188, 189, 34),
    Rgb::new(23, 190, 207),
];

/// Per-cluster colors: a cycled qualitative table plus explicit overrides.
#[derive(Debug, Clone)]
pub struct ClusterColors {
    overrides: HashMap<ClusterId, Rgba>,
    ambiguous: Rgba,
}

impl Default for ClusterColors {
    fn default() -> Self {
        Self::new(Rgba::WHITE)
    }
}

impl ClusterColors {
    pub fn new(ambiguous: Rgba) -> Self {
        Self {
            overrides: HashMap::new(),
            ambiguous,
        }
    }

    pub fn set(&mut self, cluster: ClusterId, color: Rgba) {
        self.overrides.insert(cluster, color);
    }

    pub fn color_of(&self, cluster: ClusterId) -> Rgba {
        self.overrides
            .get(&cluster)
            .copied()
            .unwrap_or_else(|| QUALITATIVE[cluster as usize % QUALITATIVE.len()].opaque())
    }

    pub fn ambiguous(&self) -> Rgba {
        self.ambiguous
    }
}

/// One color per display position: transparent for no cluster, the
/// cluster's color for exactly one, the ambiguous color for several.
pub fn cluster_strip(
    memberships: &ClusterMembership,
    order: &Order,
    colors: &ClusterColors,
) -> Result<Vec<Rgba>> {
    if memberships.len() != order.len() {
        return Err(EngineError::LengthMismatch {
            what: "cluster membership",
            expected: order.len(),
            found: memberships.len(),
        });
    }
    let strip: Vec<Rgba> = order
        .as_slice()
        .iter()
        .map(|&entity| {
            let set = &memberships.per_entity[entity];
            match set.len() {
                0 => Rgba::TRANSPARENT,
                1 => set.iter().next().map_or(Rgba::TRANSPARENT, |&c| colors.color_of(c)),
                _ => colors.ambiguous(),
            }
        })
        .collect();
    debug!(n = strip.len(), "cluster strip computed");
    Ok(strip)
}

/// Per-entity scores mapped through `colormap` over `[lo, hi]`, in display order.
pub fn score_strip(
    scores: &[f32],
    order: &Order,
    (lo, hi): (f32, f32),
    colormap: &Colormap,
    policy: DegenerateRangePolicy,
) -> Result<Vec<Rgb>> {
    if scores.len() != order.len() {
        return Err(EngineError::LengthMismatch {
            what: "scores",
            expected: order.len(),
            found: scores.len(),
        });
    }
    let q = Quantizer::new(lo, hi, policy)?;
    Ok(order
        .as_slice()
        .iter()
        .map(|&entity| colormap.resolve(q.index(scores[entity])))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub entity: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedMarker {
    /// Display position on the diagonal
    pub position: usize,
    pub label: String,
}

/// Place labeled markers at their entities' display positions, sorted by position.
pub fn place_markers(markers: &[Marker], order: &Order) -> Result<Vec<PlacedMarker>> {
    let mut placed = markers
        .iter()
        .map(|m| {
            let position = order.position_of(m.entity).ok_or(EngineError::IndexOutOfRange {
                index: m.entity,
                len: order.len(),
            })?;
            Ok(PlacedMarker {
                position,
                label: m.label.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    placed.sort_by_key(|p| p.position);
    Ok(placed)
}
