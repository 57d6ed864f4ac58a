//! Vector distance utilities.
//!
//! Pure-Rust implementations of:
//! - Euclidean (L2) distance, which the corpus ranks by (smaller is closer)
//! - Brute-force k-nearest search

use std::cmp::Ordering;

/// Euclidean distance between two vectors.
///
/// Returns `None` when the dimensions differ or either vector is empty.
pub fn l2_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x as f64) - (*y as f64);
            d * d
        })
        .sum();

    Some(sum.sqrt() as f32)
}

/// Indices of the `k` vectors closest to `query` by L2 distance, ascending.
///
/// Vectors whose dimension does not match the query are ignored. Ties keep
/// their original order.
pub fn k_nearest<'a, I>(query: &[f32], vectors: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scored: Vec<(usize, f32)> = vectors
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| l2_distance(query, v).map(|d| (i, d)))
        .collect();

    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
