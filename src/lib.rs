//! rust_edm — empirical dynamic modeling core with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the EDM prediction engine to Python via the `_rust_edm`
//! extension module. The crate reconstructs a state-space manifold from a
//! time series by time-delay embedding and predicts a target variable from
//! the nearest neighbors of each query point, by Simplex projection or by
//! S-map local linear regression.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`manifold`, `distance`, `prediction`,
//!   `driver`, `filters`, `replay`) as the public crate surface.
//! - Run one independent prediction task per query row on a bounded worker
//!   pool, under a caller-supplied cancellation probe, and reduce the
//!   per-slot outcomes into a single aggregate with per-theta rho/MAE.
//! - When the `python-bindings` feature is enabled, define the
//!   Python-facing entry point and result class for the `_rust_edm`
//!   extension module.
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work is implemented in the inner Rust modules;
//!   this file performs only FFI glue, input validation, and error mapping.
//! - The engine is deterministic given its inputs: identical options,
//!   columns, and filters produce bit-identical predictions regardless of
//!   the worker count.
//! - Missing data travels as a fixed sentinel value compared by exact
//!   equality; hosts map their native missing marker to it at the boundary.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as [`EdmError`] internally
//!   and converted to `PyErr` values at the PyO3 boundary.
//! - Host conventions for `k` (0 ⇒ manifold width + 1, negative ⇒ all
//!   surviving neighbors) and for result layouts (theta-major matrices)
//!   are preserved across the binding.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on the inner modules directly — build a
//!   [`ManifoldGenerator`], an [`EdmOptions`], and call [`driver::run`] or
//!   [`driver::run_blocking`] — and can ignore the PyO3 items guarded by
//!   the `python-bindings` feature.
//! - The Python packaging layer imports the `_rust_edm` module defined
//!   here and wraps its entry point in user-facing APIs.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by
//!   the prediction-pipeline integration suite under `tests/`.
//! - Smoke tests for the PyO3 bindings verify construction and round-trips
//!   from Python.

pub mod distance;
pub mod driver;
pub mod errors;
pub mod filters;
pub mod io;
pub mod manifold;
pub mod options;
pub mod prediction;
pub mod replay;
pub mod utils;

// ---- Re-exports (primary public surface) ----------------------------------

pub use crate::driver::{Prediction, PredictionHandle, run, run_blocking};
pub use crate::errors::{EdmError, EdmResult, ReturnCode};
pub use crate::io::{CancelFlag, CancelProbe, ConsoleIo, IoSink, NeverCancel, SilentIo};
pub use crate::manifold::{Manifold, ManifoldGenerator};
pub use crate::options::{Algorithm, DEFAULT_MISSING, DistanceKind, EdmOptions, Metric};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::utils::{extract_column, extract_filter};

/// EdmPrediction — Python-facing wrapper for a finished prediction run.
///
/// Purpose
/// -------
/// Hold the [`Prediction`] aggregate of one run and expose its matrices and
/// summaries as copy-on-access Python properties.
///
/// Fields
/// ------
/// - `inner`: [`Prediction`]
///   Full aggregate produced by the driver.
///
/// Notes
/// -----
/// - Instances are produced by [`run_edm`]; Python code never constructs
///   them directly. Native Rust callers should use [`Prediction`] instead.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_edm")]
pub struct EdmPrediction {
    inner: Prediction,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl EdmPrediction {
    /// Predictions, one row per theta, one column per query.
    #[getter]
    pub fn ystar(&self) -> Vec<Vec<f64>> {
        self.inner.ystar.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    /// Per-slot return codes (numeric severity), same layout as `ystar`.
    #[getter]
    pub fn rc(&self) -> Vec<Vec<u8>> {
        self.inner.rc.rows().into_iter().map(|row| row.iter().map(|&c| c as u8).collect()).collect()
    }

    /// S-map coefficient rows per (theta, query) when the run saved them.
    #[getter]
    pub fn coefficients(&self) -> Option<Vec<Vec<Vec<f64>>>> {
        self.inner.coefficients.as_ref().map(|cube| {
            cube.outer_iter()
                .map(|per_theta| per_theta.rows().into_iter().map(|row| row.to_vec()).collect())
                .collect()
        })
    }

    /// Pearson rho per theta against the query targets, when computed.
    #[getter]
    pub fn rho(&self) -> Option<Vec<f64>> {
        self.inner.rho.as_ref().map(|v| v.to_vec())
    }

    /// Mean absolute error per theta, when computed.
    #[getter]
    pub fn mae(&self) -> Option<Vec<f64>> {
        self.inner.mae.as_ref().map(|v| v.to_vec())
    }

    /// Human-readable worst return code of the run.
    #[getter]
    pub fn worst_rc(&self) -> String {
        self.inner.worst_rc.to_string()
    }

    #[getter]
    pub fn num_thetas(&self) -> usize {
        self.inner.num_thetas
    }

    #[getter]
    pub fn num_predictions(&self) -> usize {
        self.inner.num_predictions
    }
}

/// Run one EDM prediction from Python columns.
///
/// Columns may be numpy arrays, pandas Series, or plain sequences; NaN
/// cells read as missing. Filters are boolean (or 0/1) masks over the raw
/// rows. The call blocks until the run finishes and returns an
/// [`EdmPrediction`].
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (
        t,
        x,
        y,
        train_filter,
        predict_filter,
        e,
        tau = 1,
        thetas = None,
        algorithm = None,
        k = 0,
        distance = None,
        missing_distance = 0.0,
        force_compute = false,
        save_coefficients = false,
        extras = None,
        num_extras_lagged = 0,
        panel_ids = None,
        idw = 0.0,
        co_x = None,
        dt_weight = None,
        add_dt0 = false,
        cumulative_dt = false,
        aspect_ratio = 1.0,
        num_threads = 0,
        verbosity = 0,
    ),
    text_signature = "(t, x, y, train_filter, predict_filter, e, /, tau=1, thetas=None, \
                      algorithm='simplex', k=0, distance='euclidean', missing_distance=0.0, \
                      force_compute=False, save_coefficients=False, extras=None, \
                      num_extras_lagged=0, panel_ids=None, idw=0.0, co_x=None, dt_weight=None, \
                      add_dt0=False, cumulative_dt=False, aspect_ratio=1.0, num_threads=0, \
                      verbosity=0)"
)]
#[allow(clippy::too_many_arguments)]
pub fn run_edm<'py>(
    py: Python<'py>, t: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>, y: &Bound<'py, PyAny>,
    train_filter: &Bound<'py, PyAny>, predict_filter: &Bound<'py, PyAny>, e: usize, tau: usize,
    thetas: Option<Vec<f64>>, algorithm: Option<&str>, k: i32, distance: Option<&str>,
    missing_distance: f64, force_compute: bool, save_coefficients: bool,
    extras: Option<Vec<Bound<'py, PyAny>>>, num_extras_lagged: usize,
    panel_ids: Option<Vec<i32>>, idw: f64, co_x: Option<&Bound<'py, PyAny>>,
    dt_weight: Option<f64>, add_dt0: bool, cumulative_dt: bool, aspect_ratio: f64,
    num_threads: usize, verbosity: u8,
) -> PyResult<EdmPrediction> {
    use std::str::FromStr;

    let missing = DEFAULT_MISSING;
    let t_col = extract_column(py, t, missing)?;
    let x_col = extract_column(py, x, missing)?;
    let y_col = extract_column(py, y, missing)?;
    let training = extract_filter(py, train_filter)?;
    let prediction = extract_filter(py, predict_filter)?;

    let mut extra_cols = Vec::new();
    if let Some(columns) = &extras {
        for column in columns {
            extra_cols.push(extract_column(py, column, missing)?);
        }
    }

    let mut generator =
        ManifoldGenerator::new(t_col, x_col, y_col, extra_cols, num_extras_lagged, e, tau,
            missing)?;
    if let Some(panels) = panel_ids {
        generator.add_panel_ids(panels)?;
    }
    if let Some(column) = co_x {
        generator.add_coprediction_data(extract_column(py, column, missing)?)?;
    }
    if let Some(weight) = dt_weight {
        generator.add_dt_data(weight, add_dt0, cumulative_dt);
    }

    let algorithm = match algorithm {
        Some(name) => Algorithm::from_str(name)?,
        None => Algorithm::Simplex,
    };
    let mut options = EdmOptions::new(algorithm, thetas.unwrap_or_else(|| vec![1.0]))?;
    options.k = k;
    options.distance = match distance {
        Some(name) => DistanceKind::from_str(name)?,
        None => DistanceKind::Euclidean,
    };
    options.missing_distance = missing_distance;
    options.force_compute = force_compute;
    options.save_coefficients = save_coefficients;
    options.panel_mode = generator.panel_mode();
    options.idw = idw;
    options.aspect_ratio = aspect_ratio;
    options.num_threads = num_threads;
    options.verbosity = verbosity;

    let result = py.allow_threads(|| {
        run_blocking(&options, &generator, &training, &prediction, &ConsoleIo, &NeverCancel)
    })?;
    Ok(EdmPrediction { inner: result })
}

/// _rust_edm — PyO3 module initializer for the Python extension.
///
/// Registers the prediction entry point and its result class; the
/// user-facing `rust_edm` Python package wraps these in thin facades.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_edm<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(run_edm, m)?)?;
    m.add_class::<EdmPrediction>()?;
    Ok(())
}
