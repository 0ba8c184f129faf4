//! Matrix rendering - permuted, quantized, color-mapped rasters
//!
//! The distance matrix is never permuted in place; an [`Order`] is applied
//! while generating each image.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::colormap::{Colormap, DegenerateRangePolicy, Quantizer};
use crate::error::{EngineError, Result};
use crate::matrix::DistanceMatrix;

/// Validated permutation mapping display position to original entity index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    to_original: Vec<usize>,
    to_display: Vec<usize>,
}

impl Order {
    pub fn identity(n: usize) -> Self {
        Self {
            to_original: (0..n).collect(),
            to_display: (0..n).collect(),
        }
    }

    /// Validate `order` as a permutation of `0..n`.
    pub fn new(order: Vec<usize>, n: usize) -> Result<Self> {
        if order.len() != n {
            return Err(EngineError::LengthMismatch {
                what: "order",
                expected: n,
                found: order.len(),
            });
        }
        let mut to_display = vec![usize::MAX; n];
        for (pos, &idx) in order.iter().enumerate() {
            if idx >= n {
                return Err(EngineError::IndexOutOfRange { index: idx, len: n });
            }
            to_display[idx] = pos;
        }
        // A repeated index leaves some slot unfilled.
        if let Some(index) = to_display.iter().position(|&p| p == usize::MAX) {
            return Err(EngineError::MissingIndex { index, len: n });
        }
        Ok(Self {
            to_original: order,
            to_display,
        })
    }

    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }

    /// Original entity shown at display position `pos`.
    #[inline]
    pub fn original(&self, pos: usize) -> usize {
        self.to_original[pos]
    }

    /// Display position of original entity `entity`.
    pub fn position_of(&self, entity: usize) -> Option<usize> {
        self.to_display.get(entity).copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.to_original
    }
}

/// N×N colormap indices in display order, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorIndexImage {
    size: usize,
    indices: Vec<u8>,
}

impl ColorIndexImage {
    pub fn size(&self) -> usize {
        self.size
    }

    /// Index at display cell `(y, x)`, None outside the image.
    pub fn get(&self, y: usize, x: usize) -> Option<u8> {
        if y < self.size && x < self.size {
            Some(self.indices[y * self.size + x])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.indices
    }

    /// Resolve every index through `colormap`.
    pub fn to_rgb(&self, colormap: &Colormap) -> RgbImage {
        let data = self
            .indices
            .par_iter()
            .flat_map_iter(|&i| {
                let c = colormap.resolve(i);
                [c.r, c.g, c.b]
            })
            .collect();
        RgbImage {
            size: self.size,
            data,
        }
    }
}

/// 8-bit RGB raster, 3 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub size: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn pixel(&self, y: usize, x: usize) -> Option<[u8; 3]> {
        if y >= self.size || x >= self.size {
            return None;
        }
        let o = (y * self.size + x) * 3;
        Some([self.data[o], self.data[o + 1], self.data[o + 2]])
    }
}

/// Normalization range for a matrix: fixed for bounded measures, observed
/// min/max otherwise.
pub fn value_range(matrix: &DistanceMatrix) -> (f32, f32) {
    matrix
        .measure()
        .fixed_range()
        .or_else(|| matrix.min_max())
        .unwrap_or((0.0, 0.0))
}

/// Render `matrix` under `order`.
///
/// Only cells with `x <= y` are quantized; each is mirrored to `(x, y)`.
pub fn render(
    matrix: &DistanceMatrix,
    order: &Order,
    policy: DegenerateRangePolicy,
) -> Result<ColorIndexImage> {
    let start = Instant::now();
    let n = matrix.len();
    if order.len() != n {
        return Err(EngineError::LengthMismatch {
            what: "order",
            expected: n,
            found: order.len(),
        });
    }
    if n == 0 {
        return Ok(ColorIndexImage {
            size: 0,
            indices: Vec::new(),
        });
    }

    let (lo, hi) = value_range(matrix);
    let q = Quantizer::new(lo, hi, policy)?;

    let lower: Vec<Vec<u8>> = (0..n)
        .into_par_iter()
        .map(|y| {
            let row = matrix.row(order.original(y));
            (0..=y).map(|x| q.index(row[order.original(x)])).collect()
        })
        .collect();

    let mut indices = vec![0u8; n * n];
    for (y, row) in lower.iter().enumerate() {
        for (x, &idx) in row.iter().enumerate() {
            indices[y * n + x] = idx;
            indices[x * n + y] = idx;
        }
    }

    debug!(
        n,
        measure = %matrix.measure(),
        lo,
        hi,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "matrix image rendered"
    );
    Ok(ColorIndexImage { size: n, indices })
}

/// Raw distance under displayed coordinates `(y, x)`.
pub fn value_at(matrix: &DistanceMatrix, order: &Order, y: usize, x: usize) -> Result<f32> {
    let n = order.len();
    for pos in [y, x] {
        if pos >= n {
            return Err(EngineError::IndexOutOfRange { index: pos, len: n });
        }
    }
    matrix
        .get(order.original(y), order.original(x))
        .ok_or(EngineError::IndexOutOfRange { index: y.max(x), len: matrix.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::{quantize, MAGMA};
    use crate::matrix::build;
    use crate::measure::DistanceMeasure;

    fn features() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 2.0, 0.5],
            vec![-1.0, 0.0, 3.0],
            vec![4.0, 4.5, -2.0],
            vec![0.0, 1.0, 1.0],
        ]
    }

    #[test]
    fn test_order_validation() {
        assert!(Order::new(vec![2, 0, 1], 3).is_ok());
        assert_eq!(
            Order::new(vec![0, 3, 1], 3),
            Err(EngineError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(
            Order::new(vec![0, 0, 1], 3),
            Err(EngineError::MissingIndex { index: 2, len: 3 })
        );
        assert_eq!(
            Order::new(vec![0, 1], 3),
            Err(EngineError::LengthMismatch { what: "order", expected: 3, found: 2 })
        );
    }

    #[test]
    fn test_inverse_lookup() {
        let o = Order::new(vec![2, 0, 1], 3).unwrap();
        assert_eq!(o.original(0), 2);
        assert_eq!(o.position_of(2), Some(0));
        assert_eq!(o.position_of(1), Some(2));
        assert_eq!(o.position_of(3), None);
    }

    #[test]
    fn test_mirrored() {
        let m = build(&features(), DistanceMeasure::EuclideanNorm).unwrap();
        let order = Order::new(vec![3, 1, 0, 2], 4).unwrap();
        let img = render(&m, &order, DegenerateRangePolicy::Reject).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(img.get(y, x), img.get(x, y));
            }
        }
    }

    #[test]
    fn test_identity_order_matches_unpermuted() {
        let m = build(&features(), DistanceMeasure::Pearson).unwrap();
        let img = render(&m, &Order::identity(4), DegenerateRangePolicy::Reject).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                let direct = quantize(m.get(i, j).unwrap(), -1.0, 1.0, DegenerateRangePolicy::Reject).unwrap();
                assert_eq!(img.get(i, j), Some(direct));
            }
        }
    }

    #[test]
    fn test_permutation_consistency() {
        let m = build(&features(), DistanceMeasure::EuclideanNorm).unwrap();
        let (lo, hi) = m.min_max().unwrap();
        let p = vec![2, 3, 0, 1];
        let img = render(&m, &Order::new(p.clone(), 4).unwrap(), DegenerateRangePolicy::Reject).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let v = m.get(p[y], p[x]).unwrap();
                assert_eq!(img.get(y, x), quantize(v, lo, hi, DegenerateRangePolicy::Reject).ok());
            }
        }
    }

    #[test]
    fn test_diagonal_stays_on_diagonal() {
        let m = build(
            &[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
            DistanceMeasure::EuclideanNorm,
        )
        .unwrap();
        let order = Order::new(vec![2, 0, 1], 3).unwrap();
        let img = render(&m, &order, DegenerateRangePolicy::Reject).unwrap();
        for i in 0..3 {
            assert_eq!(img.get(i, i), Some(0));
            assert_eq!(value_at(&m, &order, i, i).unwrap(), 0.0);
        }
        // display (0, 2) is original (2, 1)
        assert_eq!(value_at(&m, &order, 0, 2).unwrap(), m.get(2, 1).unwrap());
        assert_eq!(img.get(0, 2), Some(255));
    }

    #[test]
    fn test_degenerate_range_policy() {
        let m = build(&[vec![1.0, 1.0], vec![1.0, 1.0]], DistanceMeasure::EuclideanNorm).unwrap();
        let order = Order::identity(2);
        let img = render(&m, &order, DegenerateRangePolicy::Floor).unwrap();
        assert!(img.as_slice().iter().all(|&i| i == 0));
        assert_eq!(
            render(&m, &order, DegenerateRangePolicy::Reject),
            Err(EngineError::DegenerateRange { lo: 0.0, hi: 0.0 })
        );
    }

    #[test]
    fn test_overflowing_range_rejected() {
        let m = build(&[vec![3e38], vec![-3e38], vec![0.0]], DistanceMeasure::EuclideanNorm).unwrap();
        assert_eq!(m.min_max(), Some((0.0, f32::INFINITY)));
        let order = Order::identity(3);
        assert!(matches!(
            render(&m, &order, DegenerateRangePolicy::Reject),
            Err(EngineError::DegenerateRange { .. })
        ));
        let img = render(&m, &order, DegenerateRangePolicy::Floor).unwrap();
        assert!(img.as_slice().iter().all(|&i| i == 0));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let m = build(&features(), DistanceMeasure::EuclideanNorm).unwrap();
        let img = render(&m, &Order::identity(4), DegenerateRangePolicy::Floor).unwrap();
        assert_eq!(img.get(0, 4), None);
        assert_eq!(img.get(4, 0), None);
        assert!(img.get(3, 3).is_some());
    }

    #[test]
    fn test_to_rgb() {
        let m = build(&features(), DistanceMeasure::CrossCorrelation).unwrap();
        let img = render(&m, &Order::identity(4), DegenerateRangePolicy::Floor).unwrap();
        let rgb = img.to_rgb(&MAGMA);
        assert_eq!(rgb.data.len(), 4 * 4 * 3);
        let c = MAGMA.resolve(img.get(1, 2).unwrap());
        assert_eq!(rgb.pixel(1, 2), Some([c.r, c.g, c.b]));
        // diagonal is 1.0, the top of the range
        let top = MAGMA.resolve(255);
        assert_eq!(rgb.pixel(3, 3), Some([top.r, top.g, top.b]));
        assert_eq!(rgb.pixel(0, 4), None);
    }

    #[test]
    fn test_value_at_out_of_range() {
        let m = build(&features(), DistanceMeasure::EuclideanNorm).unwrap();
        assert_eq!(
            value_at(&m, &Order::identity(4), 0, 4),
            Err(EngineError::IndexOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn test_order_length_must_match() {
        let m = build(&features(), DistanceMeasure::EuclideanNorm).unwrap();
        assert!(matches!(
            render(&m, &Order::identity(3), DegenerateRangePolicy::Floor),
            Err(EngineError::LengthMismatch { .. })
        ));
    }
}
