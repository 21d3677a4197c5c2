//! prediction — per-query neighbor selection and the two predictors.
//!
//! Purpose
//! -------
//! Turn one query row's surviving distances into one prediction per theta:
//! select the nearest neighbors once ([`neighbors`]), then run Simplex
//! projection ([`simplex`]) or the S-map local linear regression
//! ([`smap`]) for each smoothing parameter.
//!
//! Key behaviors
//! -------------
//! - Neighbor selection is shared across thetas: `k` resolves through the
//!   host convention (0 ⇒ `E_actual + 1`, negative ⇒ all survivors) and
//!   ties break on the smaller library index.
//! - Below the per-algorithm neighbor minimum the whole slot row reports
//!   [`ReturnCode::InsufficientUnique`] unless `force_compute` is set; a
//!   query with no survivors at all is insufficient regardless.
//! - The cancellation probe is polled between thetas; the remaining slots
//!   of a cancelled query keep their zero-initialized outputs and report
//!   [`ReturnCode::Cancelled`].
//!
//! Downstream usage
//! ----------------
//! - The driver calls [`predict_query`] once per query row from its worker
//!   tasks; everything here is pure over the shared blocks.

pub mod neighbors;
pub mod simplex;
pub mod smap;

use crate::distance::distances_for_query;
use crate::errors::ReturnCode;
use crate::io::CancelProbe;
use crate::manifold::Manifold;
use crate::options::{Algorithm, EdmOptions};

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::neighbors::nearest_neighbors;
pub use self::simplex::simplex_prediction;
pub use self::smap::smap_prediction;

/// Per-theta outputs of one query row.
///
/// `ystar` and `rc` always have one entry per theta; `coefficients` is
/// present only for S-map runs that requested it and then holds one row of
/// length `E_actual + 1` per theta. Slots that were never computed (the
/// query was cancelled mid-row) keep zeros; slots that were computed but
/// could not be produced carry the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPrediction {
    pub ystar: Vec<f64>,
    pub rc: Vec<ReturnCode>,
    pub coefficients: Option<Vec<Vec<f64>>>,
}

impl QueryPrediction {
    fn zeroed(num_thetas: usize, coeff_cols: Option<usize>) -> QueryPrediction {
        QueryPrediction {
            ystar: vec![0.0; num_thetas],
            rc: vec![ReturnCode::Success; num_thetas],
            coefficients: coeff_cols.map(|cols| vec![vec![0.0; cols]; num_thetas]),
        }
    }

    /// Worst return code across this query's thetas.
    pub fn worst_rc(&self) -> ReturnCode {
        self.rc.iter().copied().fold(ReturnCode::Success, ReturnCode::worst)
    }
}

/// Whether this run carries a coefficient buffer.
pub fn wants_coefficients(opts: &EdmOptions) -> bool {
    opts.algorithm == Algorithm::SMap && opts.save_coefficients
}

/// Predict query row `query` against the `candidates` of the library, once
/// per theta.
///
/// # Arguments
/// - `query`: row index into the query block.
/// - `opts`: validated run options.
/// - `library`, `queries`: blocks from one generator.
/// - `candidates`: library rows eligible as neighbors.
/// - `probe`: polled between thetas; on `true` the remaining slots report
///   [`ReturnCode::Cancelled`] and keep zeroed outputs.
pub fn predict_query(
    query: usize, opts: &EdmOptions, library: &Manifold, queries: &Manifold,
    candidates: &[usize], probe: &dyn CancelProbe,
) -> QueryPrediction {
    let missing = library.missing();
    let e_actual = library.e_actual();
    let num_thetas = opts.thetas.len();
    let coeff_cols = wants_coefficients(opts).then_some(e_actual + 1);
    let mut out = QueryPrediction::zeroed(num_thetas, coeff_cols);

    let pairs = distances_for_query(query, opts, library, queries, candidates);
    let kk = opts.effective_k(e_actual, pairs.len());
    let min_required = opts.algorithm.minimum_neighbors(e_actual);

    if pairs.is_empty() || (kk < min_required && !opts.force_compute) {
        for t in 0..num_thetas {
            out.ystar[t] = missing;
            out.rc[t] = ReturnCode::InsufficientUnique;
            if let Some(rows) = &mut out.coefficients {
                rows[t].fill(missing);
            }
        }
        return out;
    }

    let order = nearest_neighbors(&pairs, kk);

    for (t, &theta) in opts.thetas.iter().enumerate() {
        if probe.should_stop() {
            for rc in &mut out.rc[t..] {
                *rc = ReturnCode::Cancelled;
            }
            break;
        }

        match opts.algorithm {
            Algorithm::Simplex => {
                let (ystar, rc) = simplex_prediction(theta, &pairs, &order, library);
                out.ystar[t] = ystar;
                out.rc[t] = rc;
            }
            Algorithm::SMap => {
                let (ystar, coefficients, rc) = smap_prediction(
                    theta,
                    &pairs,
                    &order,
                    library,
                    queries,
                    query,
                    out.coefficients.is_some(),
                );
                out.ystar[t] = ystar;
                out.rc[t] = rc;
                if let Some(rows) = &mut out.coefficients {
                    match coefficients {
                        Some(beta) => rows[t] = beta,
                        None => rows[t].fill(missing),
                    }
                }
            }
        }
    }

    out
}
