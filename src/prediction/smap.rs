//! S-map: weighted local linear regression around the query point.
//!
//! Purpose
//! -------
//! Fit, per theta, a locally weighted linear model over the selected
//! neighbors and read the prediction off at the query point, optionally
//! keeping the fitted coefficient row (intercept plus one slope per
//! manifold column). Weights decay with distance relative to the mean
//! neighbor distance: `w_j = exp(−theta · sqrt(d_j) / mean(sqrt(d)))`.
//!
//! Key behaviors
//! -------------
//! - Only neighbors with a non-missing target and no missing manifold
//!   component become regression rows; the design matrix and target are
//!   pre-multiplied by the weights, with the weight itself in column 0 as
//!   the intercept regressor.
//! - The system is solved by thin SVD; tiny singular values are truncated,
//!   so nearly collinear neighborhoods degrade gracefully instead of
//!   blowing up.
//! - A solver failure is a recoverable per-slot condition: the slot gets
//!   the sentinel and [`ReturnCode::UnknownError`], and the run continues.
//!
//! Conventions
//! -----------
//! - The coefficient row has length `E_actual + 1` with the intercept at
//!   index 0, matching the layout hosts receive.
//! - Query components equal to the sentinel are skipped when the fitted
//!   plane is evaluated.
use crate::distance::DistanceIndexPairs;
use crate::errors::ReturnCode;
use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector, SVD};

/// Singular values below this cutoff are treated as zero by the solve.
const SVD_EPSILON: f64 = 1e-12;

/// Iteration budget for the SVD; exceeding it maps to a per-slot unknown
/// error rather than a panic.
const SVD_MAX_ITERATIONS: usize = 250;

/// One S-map prediction for a single theta over the selected neighbors.
///
/// # Arguments
/// - `theta`: smoothing parameter.
/// - `pairs`: surviving distances for this query.
/// - `order`: neighbor positions into `pairs`, nearest first.
/// - `library`: library block (regressor rows and targets).
/// - `queries`: query block; row `query` is where the fit is evaluated.
/// - `save_coefficients`: keep the fitted row for the caller.
///
/// # Returns
/// `(ystar, coefficients, rc)`:
/// - the prediction, or the sentinel when the slot cannot be produced;
/// - the coefficient row (length `E_actual + 1`) when requested and fitted;
/// - [`ReturnCode::InsufficientUnique`] when no usable regression row
///   remains, [`ReturnCode::UnknownError`] when the solve fails.
pub fn smap_prediction(
    theta: f64, pairs: &DistanceIndexPairs, order: &[usize], library: &Manifold,
    queries: &Manifold, query: usize, save_coefficients: bool,
) -> (f64, Option<Vec<f64>>, ReturnCode) {
    let missing = library.missing();
    let e_actual = library.e_actual();

    let mean_w: f64 =
        order.iter().map(|&pos| pairs.distances[pos].sqrt()).sum::<f64>() / order.len() as f64;

    let mut rows: Vec<(usize, f64)> = Vec::with_capacity(order.len());
    for &pos in order {
        let idx = pairs.indices[pos];
        if library.y(idx) == missing || library.any_missing(idx) {
            continue;
        }
        let w = (-theta * (pairs.distances[pos].sqrt() / mean_w)).exp();
        rows.push((idx, w));
    }
    if rows.is_empty() {
        return (missing, None, ReturnCode::InsufficientUnique);
    }

    let mut x_ls = DMatrix::<f64>::zeros(rows.len(), e_actual + 1);
    let mut y_ls = DVector::<f64>::zeros(rows.len());
    for (r, &(idx, w)) in rows.iter().enumerate() {
        y_ls[r] = w * library.y(idx);
        x_ls[(r, 0)] = w;
        for c in 0..e_actual {
            x_ls[(r, c + 1)] = w * library.get(idx, c);
        }
    }

    let Some(svd) = SVD::try_new(x_ls, true, true, f64::EPSILON, SVD_MAX_ITERATIONS) else {
        return (missing, None, ReturnCode::UnknownError);
    };
    let beta = match svd.solve(&y_ls, SVD_EPSILON) {
        Ok(beta) => beta,
        Err(_) => return (missing, None, ReturnCode::UnknownError),
    };

    let mut ystar = beta[0];
    for c in 0..e_actual {
        let b = queries.get(query, c);
        if b != missing {
            ystar += b * beta[c + 1];
        }
    }

    let coefficients =
        save_coefficients.then(|| beta.iter().copied().collect::<Vec<f64>>());
    (ystar, coefficients, ReturnCode::Success)
}
