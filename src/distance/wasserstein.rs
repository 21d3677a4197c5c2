//! Wasserstein curve-matching distances.
//!
//! Purpose
//! -------
//! Compare the lagged block of a query point to the lagged block of each
//! candidate as two short multivariate time series of up to `E` positions,
//! and score the pair by the cost of optimally transporting one curve onto
//! the other. Unlagged extras and the panel penalty enter as an additive
//! floor under every cell of the transport cost matrix.
//!
//! Key behaviors
//! -------------
//! - A curve position is a column of the `curve_dims × E` view (primary,
//!   optional dt, lagged extras). With `missing_distance == 0` positions
//!   containing any missing are compressed out, so the two curves may have
//!   different lengths; otherwise full length is kept and every missing
//!   pairing contributes the substitute value.
//! - When the dt row is present, its pairwise contributions are scaled by
//!   `gamma = aspect_ratio · (max_x − min_x + ε) / (max_t + ε)`, computed
//!   once per query over the non-missing entries of the query's primary and
//!   dt rows.
//! - The cost matrix is handed to the transportation solver with uniform
//!   marginals; candidates with a non-finite or zero distance are dropped,
//!   as are candidates whose compressed curve is empty. An empty query
//!   curve drops every candidate.
//!
//! Invariants & assumptions
//! ------------------------
//! - Pure over its inputs and safe to run concurrently for distinct
//!   queries; all shared state is read-only.
//! - Per-dimension comparison modes come from the metric of the
//!   dimension's first manifold column (all lags of one variable share
//!   their column metric).
use crate::distance::DistanceIndexPairs;
use crate::distance::transport::uniform_transport_cost;
use crate::manifold::Manifold;
use crate::options::{EdmOptions, Metric};
use ndarray::Array2;

/// Guard against wild aspect ratios on flat or instantaneous curves.
const GAMMA_EPSILON: f64 = 1e-6;

/// Wasserstein distances from query row `query` of `queries` to the
/// `candidates` rows of `library`, dropping empty, non-finite, and zero
/// distances.
pub fn wasserstein_distances(
    query: usize, opts: &EdmOptions, library: &Manifold, queries: &Manifold, candidates: &[usize],
) -> DistanceIndexPairs {
    let skip_missing = opts.missing_distance == 0.0;
    let e = library.e();

    let query_positions = kept_positions(queries, query, e, skip_missing);
    if query_positions.is_empty() {
        return DistanceIndexPairs::default();
    }
    let gamma = if library.e_dt() > 0 { dt_scale(queries, query, opts.aspect_ratio) } else { 1.0 };

    let mut indices = Vec::new();
    let mut distances = Vec::new();

    for &i in candidates {
        let library_positions = kept_positions(library, i, e, skip_missing);
        if library_positions.is_empty() {
            continue;
        }

        let cost =
            cost_matrix(opts, library, queries, i, query, &library_positions, &query_positions,
                gamma);
        let dist_i = uniform_transport_cost(&cost);

        if dist_i != 0.0 && dist_i.is_normal() {
            indices.push(i);
            distances.push(dist_i);
        }
    }

    DistanceIndexPairs { indices, distances }
}

/// Curve positions of point `i` that enter the cost matrix: all of them, or
/// only those free of missing entries when the drop policy is active.
fn kept_positions(block: &Manifold, i: usize, e: usize, skip_missing: bool) -> Vec<usize> {
    (0..e).filter(|&pos| !skip_missing || !block.curve_position_missing(i, pos)).collect()
}

/// Aspect scale for the dt row, from the query curve: the spread of the
/// primary row over the largest time entry, shaped by the user's aspect
/// ratio.
fn dt_scale(queries: &Manifold, query: usize, aspect_ratio: f64) -> f64 {
    let missing = queries.missing();
    let mut min_data = f64::INFINITY;
    let mut max_data = f64::NEG_INFINITY;
    let mut max_time = 0.0_f64;

    for pos in 0..queries.e() {
        let x = queries.curve_value(query, 0, pos);
        if x != missing {
            min_data = min_data.min(x);
            max_data = max_data.max(x);
        }
        let t = queries.curve_value(query, 1, pos);
        if t != missing && t > max_time {
            max_time = t;
        }
    }
    if min_data > max_data {
        min_data = 0.0;
        max_data = 0.0;
    }
    aspect_ratio * (max_data - min_data + GAMMA_EPSILON) / (max_time + GAMMA_EPSILON)
}

/// Transport cost matrix between candidate `i` and query `q`: per-dimension
/// position costs on top of the unlagged-extra / panel floor.
#[allow(clippy::too_many_arguments)]
fn cost_matrix(
    opts: &EdmOptions, library: &Manifold, queries: &Manifold, i: usize, q: usize,
    library_positions: &[usize], query_positions: &[usize], gamma: f64,
) -> Array2<f64> {
    let missing = library.missing();
    let has_dt = library.e_dt() > 0;

    let mut floor = 0.0;
    for extra in 0..library.num_unlagged_extras() {
        let a = library.unlagged_extra(i, extra);
        let b = queries.unlagged_extra(q, extra);
        if a == missing || b == missing {
            floor += opts.missing_distance;
        } else {
            floor += match opts.metric_for(library.unlagged_extra_column(extra)) {
                Metric::Diff => (a - b).abs(),
                Metric::CheckSame => f64::from(a != b),
            };
        }
    }
    if opts.panel_mode && opts.idw > 0.0 {
        floor += opts.idw * f64::from(library.panel(i) != queries.panel(q));
    }

    let mut cost = Array2::<f64>::from_elem((library_positions.len(), query_positions.len()),
        floor);

    for dim in 0..library.curve_dims() {
        let metric = opts.metric_for(library.curve_dim_column(dim));
        let scale = if has_dt && dim == 1 { gamma } else { 1.0 };

        for (n, &pos_i) in library_positions.iter().enumerate() {
            let a = library.curve_value(i, dim, pos_i);
            for (m, &pos_j) in query_positions.iter().enumerate() {
                let b = queries.curve_value(q, dim, pos_j);
                let d = if a == missing || b == missing {
                    opts.missing_distance
                } else {
                    match metric {
                        Metric::Diff => (a - b).abs(),
                        Metric::CheckSame => f64::from(a != b),
                    }
                };
                cost[[n, m]] += scale * d;
            }
        }
    }
    cost
}
