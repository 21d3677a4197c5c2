//! driver — the parallel prediction loop and its host-facing entry point.
//!
//! Purpose
//! -------
//! Materialize the library and query blocks, fan one independent task out
//! per query row, and reduce the per-slot outcomes into a single
//! [`Prediction`] aggregate: the `ystar` and return-code matrices, the
//! optional S-map coefficient cube, per-theta rho/MAE summaries, and the
//! worst return code observed anywhere in the run.
//!
//! Key behaviors
//! -------------
//! - [`run`] launches the whole computation on a detached thread and hands
//!   back a [`PredictionHandle`] the host can poll or block on;
//!   [`run_blocking`] is the same computation inline.
//! - Tasks are pure over the shared blocks and options; each writes only
//!   its own query's slots, and results are collected in query order, so
//!   identical inputs and thread counts give bit-identical outputs.
//! - The cancellation probe is polled between queries (and between thetas
//!   inside a task). Once it fires, untouched slots keep their
//!   zero-initialized values, their codes read
//!   [`ReturnCode::Cancelled`], and that marker propagates as the worst
//!   code of the run.
//! - Programmer errors (inconsistent options, bad filters) abort before
//!   any work begins; recoverable per-slot conditions never do.
//!
//! Conventions
//! -----------
//! - `ystar` is `[num_thetas, num_predictions]`, the coefficient cube is
//!   `[num_thetas, num_predictions, E_actual + 1]`, matching the layout
//!   hosts write back into their column stores.
//! - The rho/MAE reduction compares row `t` of `ystar` against the query
//!   block's target column over non-missing pairs, one entry per theta.
//!
//! Testing notes
//! -------------
//! - Unit tests below pin determinism, the insufficient-library reduction,
//!   the stats reduction, and the handle round-trip; the cancellation
//!   latency scenario lives in the integration suite.

pub mod scheduler;
pub mod stats;

use crate::errors::{EdmError, EdmResult, ReturnCode};
use crate::io::{CancelProbe, IoSink};
use crate::manifold::{Manifold, ManifoldGenerator};
use crate::options::EdmOptions;
use crate::prediction::{QueryPrediction, predict_query, wants_coefficients};
use ndarray::{Array1, Array2, Array3};
use std::sync::Arc;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::scheduler::Scheduler;
pub use self::stats::{mean_absolute_error, pearson_rho};

/// Aggregate outcome of one prediction run.
///
/// Purpose
/// -------
/// Carry everything the host writes back after a run: predictions and
/// per-slot codes for every (theta, query) pair, the optional coefficient
/// cube, and the reduced summaries.
///
/// Fields
/// ------
/// - `ystar`: predictions, `[num_thetas, num_predictions]`; slots that
///   could not be produced carry the sentinel, slots never reached carry
///   their zero initialization.
/// - `rc`: per-slot return codes, same shape.
/// - `coefficients`: S-map coefficient rows
///   (`[num_thetas, num_predictions, num_coeff_cols]`) when requested.
/// - `rho` / `mae`: per-theta summaries against the query targets, when
///   the run asked for them.
/// - `worst_rc`: the most severe code over every slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub ystar: Array2<f64>,
    pub rc: Array2<ReturnCode>,
    pub coefficients: Option<Array3<f64>>,
    pub num_thetas: usize,
    pub num_predictions: usize,
    pub num_coeff_cols: usize,
    pub rho: Option<Array1<f64>>,
    pub mae: Option<Array1<f64>>,
    pub worst_rc: ReturnCode,
}

/// Handle to a run launched by [`run`]: poll with
/// [`PredictionHandle::is_finished`], then collect with
/// [`PredictionHandle::wait`].
#[derive(Debug)]
pub struct PredictionHandle {
    handle: std::thread::JoinHandle<EdmResult<Prediction>>,
}

impl PredictionHandle {
    /// Whether the run thread has finished (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the run finishes and return its result.
    ///
    /// # Errors
    /// - Whatever [`run_blocking`] reported, or [`EdmError::Internal`] when
    ///   the run thread died without delivering a result.
    pub fn wait(self) -> EdmResult<Prediction> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                Err(EdmError::Internal { detail: "prediction thread panicked".to_string() })
            }
        }
    }
}

/// Launch a prediction run on a detached worker thread.
///
/// Parameters
/// ----------
/// - `options`: validated against the generator's manifold width before any
///   work begins.
/// - `generator`: raw columns plus embedding parameters.
/// - `training_filter` / `prediction_filter`: which raw rows become library
///   and query points.
/// - `io_sink`: receives the verbosity-gated configuration trace.
/// - `cancel_probe`: polled between queries and between thetas.
///
/// Returns
/// -------
/// A [`PredictionHandle`]; the host polls or blocks on it while the run
/// proceeds.
pub fn run(
    options: EdmOptions, generator: ManifoldGenerator, training_filter: Vec<bool>,
    prediction_filter: Vec<bool>, io_sink: Arc<dyn IoSink>, cancel_probe: Arc<dyn CancelProbe>,
) -> PredictionHandle {
    let handle = std::thread::spawn(move || {
        run_blocking(
            &options,
            &generator,
            &training_filter,
            &prediction_filter,
            io_sink.as_ref(),
            cancel_probe.as_ref(),
        )
    });
    PredictionHandle { handle }
}

/// Run a prediction to completion on the calling thread.
///
/// Same computation as [`run`]; hosts that already own a worker thread (and
/// the replay driver) call this directly.
///
/// # Errors
/// - Option/filter validation failures, before any work begins.
pub fn run_blocking(
    options: &EdmOptions, generator: &ManifoldGenerator, training_filter: &[bool],
    prediction_filter: &[bool], io_sink: &dyn IoSink, cancel_probe: &dyn CancelProbe,
) -> EdmResult<Prediction> {
    options.validate(generator.e_actual())?;

    let library = generator.create_manifold(training_filter, false)?;
    let queries = generator.create_manifold(prediction_filter, true)?;
    let sched = Scheduler::resolve(options.num_threads, options.distribute_threads);

    trace_configuration(options, generator, &library, &queries, &sched, io_sink);

    let candidates: Vec<usize> = (0..library.nobs()).collect();
    let num_thetas = options.thetas.len();
    let num_predictions = queries.nobs();

    let rows: Vec<QueryPrediction> = sched.map_indexed(num_predictions, |q| {
        if cancel_probe.should_stop() {
            cancelled_row(options, &library)
        } else {
            predict_query(q, options, &library, &queries, &candidates, cancel_probe)
        }
    });

    Ok(assemble(options, &library, &queries, rows, num_thetas, num_predictions))
}

/// Placeholder row for a query abandoned before its task started: zeroed
/// outputs, every slot cancelled.
fn cancelled_row(options: &EdmOptions, library: &Manifold) -> QueryPrediction {
    let num_thetas = options.thetas.len();
    QueryPrediction {
        ystar: vec![0.0; num_thetas],
        rc: vec![ReturnCode::Cancelled; num_thetas],
        coefficients: wants_coefficients(options)
            .then(|| vec![vec![0.0; library.e_actual() + 1]; num_thetas]),
    }
}

fn assemble(
    options: &EdmOptions, library: &Manifold, queries: &Manifold, rows: Vec<QueryPrediction>,
    num_thetas: usize, num_predictions: usize,
) -> Prediction {
    let coeff_cols = if wants_coefficients(options) { library.e_actual() + 1 } else { 0 };

    let mut ystar = Array2::<f64>::zeros((num_thetas, num_predictions));
    let mut rc = Array2::from_elem((num_thetas, num_predictions), ReturnCode::Success);
    let mut coefficients = (coeff_cols > 0)
        .then(|| Array3::<f64>::zeros((num_thetas, num_predictions, coeff_cols)));

    let mut worst_rc = ReturnCode::Success;
    for (q, row) in rows.into_iter().enumerate() {
        for t in 0..num_thetas {
            ystar[[t, q]] = row.ystar[t];
            rc[[t, q]] = row.rc[t];
            worst_rc = worst_rc.worst(row.rc[t]);
        }
        if let (Some(cube), Some(beta_rows)) = (&mut coefficients, &row.coefficients) {
            for t in 0..num_thetas {
                for (c, &value) in beta_rows[t].iter().enumerate() {
                    cube[[t, q, c]] = value;
                }
            }
        }
    }

    let (rho, mae) = if options.report_stats {
        let observed = queries.targets().to_vec();
        let missing = library.missing();
        let mut rho = Array1::<f64>::zeros(num_thetas);
        let mut mae = Array1::<f64>::zeros(num_thetas);
        for t in 0..num_thetas {
            let predicted = ystar.row(t).to_vec();
            rho[t] = pearson_rho(&predicted, &observed, missing);
            mae[t] = mean_absolute_error(&predicted, &observed, missing);
        }
        (Some(rho), Some(mae))
    } else {
        (None, None)
    };

    Prediction {
        ystar,
        rc,
        coefficients,
        num_thetas,
        num_predictions,
        num_coeff_cols: coeff_cols,
        rho,
        mae,
        worst_rc,
    }
}

/// Configuration trace before work begins, in the host's console.
fn trace_configuration(
    options: &EdmOptions, generator: &ManifoldGenerator, library: &Manifold, queries: &Manifold,
    sched: &Scheduler, io_sink: &dyn IoSink,
) {
    if options.verbosity <= 1 {
        return;
    }
    io_sink.print("Starting EDM prediction run\n");
    for theta in &options.thetas {
        io_sink.print(&format!("theta = {theta:6.4}\n"));
    }
    io_sink.print(&format!("algorithm = {}\n", options.algorithm));
    io_sink.print(&format!("distance = {:?}\n", options.distance));
    io_sink.print(&format!("k = {}\n", options.k));
    io_sink.print(&format!("force compute = {}\n", options.force_compute));
    io_sink.print(&format!("missing distance = {:.6}\n", options.missing_distance));
    io_sink.print(&format!("number of variables in manifold = {}\n", generator.e_actual()));
    io_sink.print(&format!("train set obs: {}\n", library.nobs()));
    io_sink.print(&format!("predict set obs: {}\n", queries.nobs()));
    io_sink.print(&format!("Using {} threads\n", sched.num_threads()));
    io_sink.flush();
}
