//! distance — per-query distances from a query point to the library.
//!
//! Purpose
//! -------
//! Provide the distance layer of the prediction pipeline: given one query
//! row and an explicit candidate set, produce the surviving library indices
//! and their distances under the configured metric. Three metrics are
//! supported — Euclidean and mean-absolute-error over the embedded columns
//! ([`lp`]) and the optimal-transport curve distance ([`wasserstein`]) with
//! its standalone transportation solver ([`transport`]).
//!
//! Key behaviors
//! -------------
//! - Candidates with a missing or exactly-zero distance are dropped, so a
//!   library point identical to the query never becomes its own neighbor
//!   and weight denominators stay non-degenerate.
//! - The missing-component policy is uniform across metrics:
//!   `missing_distance == 0` drops the pair, a positive value contributes
//!   per missing component (even when both components are missing).
//! - Everything here is pure over shared read-only blocks; workers call it
//!   concurrently for distinct queries without coordination.
//!
//! Downstream usage
//! ----------------
//! - The per-query worker calls [`distances_for_query`], which dispatches
//!   on the configured [`DistanceKind`] and feeds the surviving pairs to
//!   the neighbor selection in the prediction module.

pub mod lp;
pub mod transport;
pub mod wasserstein;

use crate::manifold::Manifold;
use crate::options::{DistanceKind, EdmOptions};

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::lp::lp_distances;
pub use self::transport::uniform_transport_cost;
pub use self::wasserstein::wasserstein_distances;

/// Surviving candidate indices and their distances, kept parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceIndexPairs {
    /// Library row indices that survived the distance computation.
    pub indices: Vec<usize>,
    /// Distances aligned with `indices`; finite and strictly positive.
    pub distances: Vec<f64>,
}

impl DistanceIndexPairs {
    /// Number of surviving candidates.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no candidate survived.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Distances from query row `query` to the `candidates` under the metric
/// selected in `opts`.
pub fn distances_for_query(
    query: usize, opts: &EdmOptions, library: &Manifold, queries: &Manifold, candidates: &[usize],
) -> DistanceIndexPairs {
    match opts.distance {
        DistanceKind::Euclidean | DistanceKind::MeanAbsoluteError => {
            lp_distances(query, opts, library, queries, candidates)
        }
        DistanceKind::Wasserstein => {
            wasserstein_distances(query, opts, library, queries, candidates)
        }
    }
}
