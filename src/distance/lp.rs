//! L^p distances between a query point and a set of library points.
//!
//! Purpose
//! -------
//! Compute, for one query row, the distance to every candidate library row
//! under the Euclidean or mean-absolute-error reduction, with per-column
//! comparison modes, the missing-component policy, and the soft inter-panel
//! penalty. Candidates whose distance is missing or exactly zero are
//! dropped, so a point identical to the query is never its own neighbor.
//!
//! Conventions
//! -----------
//! - `missing_distance == 0` drops the whole pair on the first missing
//!   component; a positive value contributes per missing component, even
//!   when both components are missing.
//! - Euclidean accumulates squared differences and takes the root at the
//!   end; MAE accumulates `|d| / E_actual`.
//! - Pure over its inputs: shared blocks are read-only and the function is
//!   safe to call concurrently for distinct queries.
use crate::distance::DistanceIndexPairs;
use crate::manifold::Manifold;
use crate::options::{DistanceKind, EdmOptions, Metric};

/// Distances from query row `query` of `queries` to the `candidates` rows
/// of `library`, dropping missing and zero distances.
///
/// # Arguments
/// - `query`: row index into the query block.
/// - `opts`: run options (distance family, metrics, missing policy, panel
///   penalty).
/// - `library`, `queries`: the two blocks built by one generator.
/// - `candidates`: library row indices to compare against.
///
/// # Returns
/// Parallel vectors of surviving library indices and their distances.
pub fn lp_distances(
    query: usize, opts: &EdmOptions, library: &Manifold, queries: &Manifold, candidates: &[usize],
) -> DistanceIndexPairs {
    let missing = library.missing();
    let e_actual = library.e_actual();
    let query_row = queries.row(query);

    let mut indices = Vec::new();
    let mut distances = Vec::new();

    for &i in candidates {
        let mut dist_i = 0.0;
        let mut dropped = false;

        if opts.panel_mode && opts.idw > 0.0 {
            dist_i += opts.idw * f64::from(library.panel(i) != queries.panel(query));
        }

        for j in 0..e_actual {
            let a = library.get(i, j);
            let b = query_row[j];

            let dist_ij = if a == missing || b == missing {
                if opts.missing_distance == 0.0 {
                    dropped = true;
                    break;
                }
                opts.missing_distance
            } else {
                match opts.metric_for(j) {
                    Metric::Diff => a - b,
                    Metric::CheckSame => f64::from(a != b),
                }
            };

            if opts.distance == DistanceKind::MeanAbsoluteError {
                dist_i += dist_ij.abs() / e_actual as f64;
            } else {
                dist_i += dist_ij * dist_ij;
            }
        }

        if !dropped && dist_i != 0.0 {
            if opts.distance == DistanceKind::MeanAbsoluteError {
                distances.push(dist_i);
            } else {
                distances.push(dist_i.sqrt());
            }
            indices.push(i);
        }
    }

    DistanceIndexPairs { indices, distances }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::ManifoldGenerator;
    use crate::options::Algorithm;

    const MISSING: f64 = f64::MAX;

    fn simple_blocks(x: Vec<f64>) -> (Manifold, Manifold) {
        let n = x.len();
        let t: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y = x.clone();
        let g = ManifoldGenerator::new(t, x, y, vec![], 0, 2, 1, MISSING).unwrap();
        let filter = vec![true; n];
        let library = g.create_manifold(&filter, false).unwrap();
        let queries = library.clone();
        (library, queries)
    }

    fn euclidean_opts() -> EdmOptions {
        EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap()
    }

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The Euclidean and MAE reductions on hand-computed rows.
    // - Zero-distance (self-match) dropping.
    // - Both missing policies (drop vs substitute), including the
    //   missing-data scenario from the acceptance suite.
    // - CheckSame columns and the panel penalty seed.
    //
    // They intentionally DO NOT cover:
    // - Neighbor selection or predictions; those consume these outputs and
    //   are tested in the prediction module.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Pin the Euclidean reduction and the self-match drop on a library that
    // contains the query itself.
    //
    // Given
    // -----
    // - x = [0, 1, 2, 3], E = 2, tau = 1; query = row 2 ([2, 1]).
    //
    // Expect
    // ------
    // - Row 2 (distance 0) is dropped; rows 1 and 3 sit at sqrt(2); row 0
    //   contains a sentinel lag and is dropped under the zero policy.
    fn euclidean_drops_self_matches_and_missing_rows() {
        let (library, queries) = simple_blocks(vec![0.0, 1.0, 2.0, 3.0]);
        let opts = euclidean_opts();
        let out = lp_distances(2, &opts, &library, &queries, &[0, 1, 2, 3]);

        assert_eq!(out.indices, vec![1, 3]);
        assert!((out.distances[0] - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((out.distances[1] - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The MAE reduction averages absolute component differences over
    // E_actual instead of taking a root of squares.
    //
    // Given
    // -----
    // - Same blocks as above, query row 2, candidate row 3 ([3, 2]).
    //
    // Expect
    // ------
    // - distance = (|3−2| + |2−1|) / 2 = 1.
    fn mae_averages_absolute_differences() {
        let (library, queries) = simple_blocks(vec![0.0, 1.0, 2.0, 3.0]);
        let mut opts = euclidean_opts();
        opts.distance = DistanceKind::MeanAbsoluteError;
        let out = lp_distances(2, &opts, &library, &queries, &[3]);

        assert_eq!(out.indices, vec![3]);
        assert!((out.distances[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The two missing policies on the same data: a sentinel in one library
    // row either removes that row from every candidate set or contributes
    // the substitute value component-wise.
    //
    // Given
    // -----
    // - x = [0, 1, 2, 3, 4] with x[1] = MISSING, so library row 1 ([x1, x0])
    //   and row 2 ([x2, x1]) each carry one sentinel.
    // - Query row 4 ([4, 3]).
    //
    // Expect
    // ------
    // - missing_distance = 0: rows 1 and 2 are dropped.
    // - missing_distance = 1: row 2 survives with distance
    //   sqrt((4−2)² + 1²) = sqrt(5).
    fn missing_policy_drop_versus_substitute() {
        let mut x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        x[1] = MISSING;
        let (library, queries) = simple_blocks(x);

        let opts = euclidean_opts();
        let out = lp_distances(4, &opts, &library, &queries, &[1, 2, 3]);
        assert_eq!(out.indices, vec![3]);

        let mut opts = euclidean_opts();
        opts.missing_distance = 1.0;
        let out = lp_distances(4, &opts, &library, &queries, &[2]);
        assert_eq!(out.indices, vec![2]);
        assert!((out.distances[0] - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // CheckSame columns contribute an equality indicator instead of a
    // difference.
    //
    // Given
    // -----
    // - Query row 2 ([2, 1]) against row 3 ([3, 2]) with both columns
    //   CheckSame.
    //
    // Expect
    // ------
    // - distance = sqrt(1 + 1): both columns differ.
    fn checksame_columns_count_mismatches() {
        let (library, queries) = simple_blocks(vec![0.0, 1.0, 2.0, 3.0]);
        let mut opts = euclidean_opts();
        opts.metrics = vec![Metric::CheckSame, Metric::CheckSame];
        let out = lp_distances(2, &opts, &library, &queries, &[3]);

        assert!((out.distances[0] - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // In panel mode with idw > 0, cross-panel candidates carry the penalty
    // as a distance floor before any component contributes.
    //
    // Given
    // -----
    // - Two panels over x[i] = i, idw = 10; query in panel 0.
    //
    // Expect
    // ------
    // - A same-panel candidate at component distance sqrt(2) stays below
    //   any cross-panel candidate, whose distance is at least sqrt(100).
    fn panel_penalty_floors_cross_panel_candidates() {
        let n = 8;
        let t: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y = x.clone();
        let mut g = ManifoldGenerator::new(t, x, y, vec![], 0, 2, 1, MISSING).unwrap();
        g.add_panel_ids(vec![0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        let filter = vec![true; n];
        let library = g.create_manifold(&filter, false).unwrap();
        let queries = library.clone();

        let mut opts = euclidean_opts();
        opts.panel_mode = true;
        opts.idw = 10.0;

        let out = lp_distances(2, &opts, &library, &queries, &[1, 5]);
        assert_eq!(out.indices, vec![1, 5]);
        assert!(out.distances[0] < out.distances[1]);
        assert!(out.distances[1] * out.distances[1] >= 10.0);
    }
}
