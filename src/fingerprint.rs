//! Dataset Fingerprint — identity of a (feature set, measure) pair
//!
//! Layout: SHA256(0x00 | measure tag | N | L) chained with
//! SHA256(0x01 | prev | row bytes) per feature vector.
//! Equal fingerprints mean an existing matrix can be reused as is.

use sha2::{Digest, Sha256};

use crate::measure::DistanceMeasure;

/// Header hash: SHA256(0x00 || tag || n || dim)
fn hash_header(measure: DistanceMeasure, n: usize, dim: usize) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x00, measure.tag()]);
    hasher.update((n as u64).to_le_bytes());
    hasher.update((dim as u64).to_le_bytes());
    hasher.finalize().into()
}

/// Chain link: SHA256(0x01 || prev || row)
fn hash_row(prev: &[u8; 32], row: &[f32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(prev);
    for v in row {
        hasher.update(v.to_bits().to_le_bytes());
    }
    hasher.finalize().into()
}

/// Fingerprint of `features` under `measure`. Returns 64-character hex.
pub fn fingerprint(features: &[Vec<f32>], measure: DistanceMeasure) -> String {
    let dim = features.first().map_or(0, Vec::len);
    let root = features
        .iter()
        .fold(hash_header(measure, features.len(), dim), |chain, row| hash_row(&chain, row));
    hex::encode(root)
}
