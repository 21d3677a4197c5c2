//! Nearest-neighbor selection over surviving distances.
//!
//! Selection is by smallest distance with ties broken by smaller library
//! index, which makes the neighbor set (and therefore every downstream
//! reduction) deterministic for identical inputs.
use crate::distance::DistanceIndexPairs;

/// Positions (into `pairs`) of the `kk` nearest surviving candidates, in
/// ascending (distance, library index) order.
///
/// `kk` larger than the surviving count returns everything; the engine
/// guarantees finite distances, so the total order is well-defined.
pub fn nearest_neighbors(pairs: &DistanceIndexPairs, kk: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pairs.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        pairs.distances[a]
            .total_cmp(&pairs.distances[b])
            .then(pairs.indices[a].cmp(&pairs.indices[b]))
    });
    order.truncate(kk);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Equal distances must resolve by smaller library index so two runs
    // always pick the same neighbor set.
    //
    // Given
    // -----
    // - Distances [3, 1, 1, 2] for library rows [9, 7, 4, 5].
    //
    // Expect
    // ------
    // - Order by (distance, index): rows 4, 7, 5, then 9; truncation to
    //   k = 2 keeps rows 4 and 7.
    fn ties_resolve_by_smaller_library_index() {
        let pairs = DistanceIndexPairs {
            indices: vec![9, 7, 4, 5],
            distances: vec![3.0, 1.0, 1.0, 2.0],
        };

        let order = nearest_neighbors(&pairs, 4);
        let rows: Vec<usize> = order.iter().map(|&p| pairs.indices[p]).collect();
        assert_eq!(rows, vec![4, 7, 5, 9]);

        let order = nearest_neighbors(&pairs, 2);
        let rows: Vec<usize> = order.iter().map(|&p| pairs.indices[p]).collect();
        assert_eq!(rows, vec![4, 7]);
    }

    #[test]
    // Purpose
    // -------
    // Asking for more neighbors than survived returns them all.
    fn oversized_k_returns_every_survivor() {
        let pairs = DistanceIndexPairs { indices: vec![1, 2], distances: vec![0.5, 0.25] };
        assert_eq!(nearest_neighbors(&pairs, 10).len(), 2);
    }
}
