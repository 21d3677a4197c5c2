//! Simplex projection: exponentially weighted average of neighbor targets.
//!
//! Weights decay with the root of the distance ratio to the nearest
//! neighbor, `w_j = exp(−theta · sqrt(d_j / d_0))`, so `theta = 0` reduces
//! to a plain average and larger theta concentrates mass on the closest
//! points. Neighbors whose target is the sentinel are skipped; if nothing
//! contributes, the slot reports an insufficient-unique code with a
//! sentinel output.
use crate::distance::DistanceIndexPairs;
use crate::errors::ReturnCode;
use crate::manifold::Manifold;

/// One Simplex prediction for a single theta over the selected neighbors.
///
/// # Arguments
/// - `theta`: smoothing parameter.
/// - `pairs`: surviving distances for this query.
/// - `order`: neighbor positions into `pairs`, nearest first.
/// - `library`: the library block (targets and sentinel).
///
/// # Returns
/// `(ystar, rc)` — the prediction, or the sentinel with
/// [`ReturnCode::InsufficientUnique`] when no neighbor contributes.
pub fn simplex_prediction(
    theta: f64, pairs: &DistanceIndexPairs, order: &[usize], library: &Manifold,
) -> (f64, ReturnCode) {
    let missing = library.missing();
    let d_base = pairs.distances[order[0]];

    let mut sum_w = 0.0;
    let mut sum_wy = 0.0;
    for &pos in order {
        let y = library.y(pairs.indices[pos]);
        if y == missing {
            continue;
        }
        let w = (-theta * (pairs.distances[pos] / d_base).sqrt()).exp();
        sum_w += w;
        sum_wy += w * y;
    }

    if sum_w == 0.0 {
        return (missing, ReturnCode::InsufficientUnique);
    }
    (sum_wy / sum_w, ReturnCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    const MISSING: f64 = f64::MAX;

    fn library_with_targets(y: Vec<f64>) -> Manifold {
        let nobs = y.len();
        Manifold::new(
            Array2::zeros((nobs, 1)),
            Array1::from(y),
            vec![],
            (0..nobs).collect(),
            1,
            0,
            0,
            0,
            MISSING,
        )
    }

    #[test]
    // Purpose
    // -------
    // theta = 0 weighs every neighbor equally; a positive theta pulls the
    // prediction toward the nearest neighbor's target.
    //
    // Given
    // -----
    // - Two neighbors at distances 1 and 4 with targets 2 and 6.
    //
    // Expect
    // ------
    // - theta = 0 predicts the plain mean 4.
    // - theta = 2 predicts strictly closer to 2 than the mean.
    fn theta_interpolates_between_mean_and_nearest() {
        let library = library_with_targets(vec![2.0, 6.0]);
        let pairs = DistanceIndexPairs { indices: vec![0, 1], distances: vec![1.0, 4.0] };
        let order = vec![0, 1];

        let (flat, rc) = simplex_prediction(0.0, &pairs, &order, &library);
        assert_eq!(rc, ReturnCode::Success);
        assert!((flat - 4.0).abs() < 1e-12);

        let (sharp, rc) = simplex_prediction(2.0, &pairs, &order, &library);
        assert_eq!(rc, ReturnCode::Success);
        assert!(sharp < flat && sharp > 2.0);
    }

    #[test]
    // Purpose
    // -------
    // Neighbors with a sentinel target are skipped; when every neighbor is
    // skipped the slot reports insufficient-unique with a sentinel output.
    fn missing_targets_are_skipped_and_empty_slots_flagged() {
        let library = library_with_targets(vec![MISSING, 6.0]);
        let pairs = DistanceIndexPairs { indices: vec![0, 1], distances: vec![1.0, 4.0] };
        let order = vec![0, 1];

        let (ystar, rc) = simplex_prediction(1.0, &pairs, &order, &library);
        assert_eq!(rc, ReturnCode::Success);
        assert!((ystar - 6.0).abs() < 1e-12);

        let library = library_with_targets(vec![MISSING, MISSING]);
        let (ystar, rc) = simplex_prediction(1.0, &pairs, &order, &library);
        assert_eq!(rc, ReturnCode::InsufficientUnique);
        assert_eq!(ystar, MISSING);
    }

    #[test]
    // Purpose
    // -------
    // Normalized weights must sum to one whenever any neighbor survives;
    // equivalently the prediction of constant targets is that constant.
    fn constant_targets_are_reproduced_exactly() {
        let library = library_with_targets(vec![5.0, 5.0, 5.0]);
        let pairs =
            DistanceIndexPairs { indices: vec![0, 1, 2], distances: vec![0.5, 1.0, 2.0] };
        let order = vec![0, 1, 2];

        let (ystar, rc) = simplex_prediction(1.7, &pairs, &order, &library);
        assert_eq!(rc, ReturnCode::Success);
        assert!((ystar - 5.0).abs() < 1e-12);
    }
}
