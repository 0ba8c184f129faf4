//! Distance measures between two equal-length feature vectors.
//!
//! All sums accumulate in f64 and the result is narrowed to f32 once.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selects the scoring function applied to every entity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMeasure {
    EuclideanNorm,
    CrossCorrelation,
    Pearson,
}

/// Which argument of a measure call was degenerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Left,
    Right,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureError {
    #[error("vector lengths differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("{operand:?} operand has zero norm")]
    DegenerateInput { operand: Operand },
}

impl DistanceMeasure {
    pub const ALL: [DistanceMeasure; 3] = [
        DistanceMeasure::EuclideanNorm,
        DistanceMeasure::CrossCorrelation,
        DistanceMeasure::Pearson,
    ];

    /// Score a pair of vectors under this measure.
    pub fn score(self, a: &[f32], b: &[f32]) -> Result<f32, MeasureError> {
        match self {
            DistanceMeasure::EuclideanNorm => euclidean_norm(a, b),
            DistanceMeasure::CrossCorrelation => cross_correlation(a, b),
            DistanceMeasure::Pearson => pearson(a, b),
        }
    }

    /// Theoretical value range used for normalization, or None when it must
    /// be taken from the data (unbounded measures).
    pub fn fixed_range(self) -> Option<(f32, f32)> {
        match self {
            DistanceMeasure::EuclideanNorm => None,
            DistanceMeasure::CrossCorrelation => Some((0.0, 1.0)),
            DistanceMeasure::Pearson => Some((-1.0, 1.0)),
        }
    }

    /// Stable tag mixed into dataset fingerprints.
    pub fn tag(self) -> u8 {
        match self {
            DistanceMeasure::EuclideanNorm => 0,
            DistanceMeasure::CrossCorrelation => 1,
            DistanceMeasure::Pearson => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DistanceMeasure::EuclideanNorm => "euclidean",
            DistanceMeasure::CrossCorrelation => "cross_correlation",
            DistanceMeasure::Pearson => "pearson",
        }
    }

    /// Parse the names produced by [`DistanceMeasure::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for DistanceMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_len(a: &[f32], b: &[f32]) -> Result<(), MeasureError> {
    if a.len() != b.len() {
        return Err(MeasureError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Euclidean distance `sqrt(Σ (a_i - b_i)²)`.
pub fn euclidean_norm(a: &[f32], b: &[f32]) -> Result<f32, MeasureError> {
    check_len(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum.sqrt() as f32)
}

/// Normalized dot product `Σ a_i b_i / (|a| |b|)`.
pub fn cross_correlation(a: &[f32], b: &[f32]) -> Result<f32, MeasureError> {
    check_len(a, b)?;
    let (mut dot, mut aa, mut bb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }
    if aa == 0.0 {
        return Err(MeasureError::DegenerateInput { operand: Operand::Left });
    }
    if bb == 0.0 {
        return Err(MeasureError::DegenerateInput { operand: Operand::Right });
    }
    Ok((dot / (aa.sqrt() * bb.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Cross-correlation of the mean-centered vectors.
pub fn pearson(a: &[f32], b: &[f32]) -> Result<f32, MeasureError> {
    check_len(a, b)?;
    // Zero variance is detected exactly; the centered sums below would only
    // be approximately zero for a constant vector.
    if is_constant(a) {
        return Err(MeasureError::DegenerateInput { operand: Operand::Left });
    }
    if is_constant(b) {
        return Err(MeasureError::DegenerateInput { operand: Operand::Right });
    }
    let ma = mean(a);
    let mb = mean(b);
    let (mut dot, mut aa, mut bb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64 - ma, y as f64 - mb);
        dot += x * y;
        aa += x * x;
        bb += y * y;
    }
    Ok((dot / (aa.sqrt() * bb.sqrt())).clamp(-1.0, 1.0) as f32)
}

fn mean(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64).sum::<f64>() / v.len() as f64
}

fn is_constant(v: &[f32]) -> bool {
    match v.first() {
        Some(&first) => v.iter().all(|&x| x == first),
        None => true,
    }
}
