//! Symmetric pairwise distance matrix (O(N²/2) evaluations)

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::measure::{DistanceMeasure, MeasureError, Operand};

/// N×N distances in the original entity ordering, stored row-major.
///
/// Immutable once built. A new measure or feature set means a new matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    measure: DistanceMeasure,
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// Number of entities.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn measure(&self) -> DistanceMeasure {
        self.measure
    }

    /// Distance between original entities `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        if i < self.n && j < self.n {
            Some(self.values[i * self.n + j])
        } else {
            None
        }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.n).map(|i| self.row(i).to_vec()).collect()
    }

    /// Smallest and largest observed value, ignoring NaN. None when empty.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Compute the full distance matrix in parallel on the current rayon pool.
///
/// Only pairs with `i <= j` are evaluated; each score is written to both
/// `(i, j)` and `(j, i)`, so the result is exactly symmetric. Any failing
/// pair aborts the build; the error reported is the lowest failing `(i, j)`.
pub fn build(features: &[Vec<f32>], measure: DistanceMeasure) -> Result<DistanceMatrix> {
    let start = Instant::now();
    let n = features.len();
    if let Some(first) = features.first() {
        let dim = first.len();
        if let Some((entity, v)) = features.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(EngineError::DimensionMismatch {
                entity,
                expected: dim,
                found: v.len(),
            });
        }
    }

    // Row i holds scores for j in i..n. Rows are gathered before the
    // errors are inspected so the reported pair does not depend on scheduling.
    let rows: Vec<Result<Vec<f32>>> = features
        .par_iter()
        .enumerate()
        .map(|(i, v1)| {
            features[i..]
                .iter()
                .enumerate()
                .map(|(k, v2)| {
                    measure
                        .score(v1, v2)
                        .map_err(|e| pair_error(e, measure, i, i + k))
                })
                .collect::<Result<Vec<f32>>>()
        })
        .collect();
    let upper = rows.into_iter().collect::<Result<Vec<_>>>()?;

    let mut values = vec![0.0f32; n * n];
    for (i, row) in upper.iter().enumerate() {
        for (k, &score) in row.iter().enumerate() {
            let j = i + k;
            values[i * n + j] = score;
            values[j * n + i] = score;
        }
    }

    debug!(
        n,
        %measure,
        pairs = n * (n + 1) / 2,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "distance matrix built"
    );
    Ok(DistanceMatrix { n, measure, values })
}

fn pair_error(err: MeasureError, measure: DistanceMeasure, i: usize, j: usize) -> EngineError {
    match err {
        MeasureError::DimensionMismatch { left, right } => EngineError::DimensionMismatch {
            entity: j,
            expected: left,
            found: right,
        },
        MeasureError::DegenerateInput { operand } => EngineError::DegenerateInput {
            measure,
            entity: match operand {
                Operand::Left => i,
                Operand::Right => j,
            },
        },
    }
}
