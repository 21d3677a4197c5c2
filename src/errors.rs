//! Errors and per-slot return codes for EDM runs (option validation, raw-data
//! checks, replay-format violations, and recoverable per-prediction codes).
//!
//! This module defines the crate-wide error type, [`EdmError`], and the
//! per-slot code type, [`ReturnCode`]. The split follows the run lifecycle:
//! anything wrong before work begins (bad options, inconsistent columns, a
//! malformed replay file) aborts with an `EdmError`; anything recoverable
//! that happens inside a single prediction slot (too few usable neighbors, a
//! degenerate weight sum, a failed least-squares solve) is recorded as a
//! `ReturnCode` in the result buffers while the rest of the run continues.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to raw observation positions unless a
//!   variant says otherwise.
//! - `ReturnCode` severity is total-ordered; the driver reduces slots with
//!   `max` and reports the worst code for the whole run.
//! - Host boundaries convert `EdmError` to their native error type; the
//!   PyO3 conversion lives here behind the `python-bindings` feature.
#[cfg(feature = "python-bindings")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

/// Crate-wide result alias for operations that may produce [`EdmError`].
pub type EdmResult<T> = Result<T, EdmError>;

/// Per-slot outcome of one prediction (one theta, one query row).
///
/// Ordered by severity, lowest to highest; the derived `Ord` is the
/// reduction order used by the driver, so adding a variant means placing it
/// by severity, not by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ReturnCode {
    /// The slot produced a prediction.
    Success = 0,

    /// Too few usable neighbors survived and `force_compute` was off, or a
    /// recoverable degeneracy (all neighbor targets missing, zero weight
    /// sum, no usable regression rows) emptied the slot.
    InsufficientUnique = 1,

    /// An algorithm name reached the engine that it does not recognize.
    InvalidAlgorithm = 2,

    /// A recognized option combination the engine cannot compute yet.
    NotImplemented = 3,

    /// The cancellation probe fired before this slot was computed.
    Cancelled = 4,

    /// A numerical failure inside the slot (e.g. the SVD solve did not
    /// converge).
    UnknownError = 5,
}

impl ReturnCode {
    /// Reduce two codes to the more severe one.
    pub fn worst(self, other: ReturnCode) -> ReturnCode {
        self.max(other)
    }
}

impl std::fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReturnCode::Success => "success",
            ReturnCode::InsufficientUnique => "insufficient number of unique observations",
            ReturnCode::InvalidAlgorithm => "invalid algorithm argument",
            ReturnCode::NotImplemented => "method is not yet implemented",
            ReturnCode::Cancelled => "run was cancelled",
            ReturnCode::UnknownError => "unknown error",
        };
        write!(f, "{s}")
    }
}

/// Unified error type for EDM run construction.
///
/// Covers option validation, raw-column consistency checks, embedding
/// parameter checks, and replay-file decoding. Implements
/// `Display`/`Error` and converts to a Python `ValueError` at PyO3
/// boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum EdmError {
    // ---- Raw-data validation ----
    /// The raw series is empty.
    EmptySeries,

    /// A raw column's length disagrees with the primary series.
    ColumnLengthMismatch { column: &'static str, expected: usize, actual: usize },

    /// A row filter's length disagrees with the raw series.
    FilterLengthMismatch { expected: usize, actual: usize },

    // ---- Embedding parameters ----
    /// The embedding dimension must satisfy E >= 1.
    InvalidEmbeddingDim { e: usize },

    /// The lag step must satisfy tau >= 1.
    InvalidTau { tau: usize },

    /// More lagged extras were requested than extras supplied.
    TooManyLaggedExtras { num_extras: usize, num_extras_lagged: usize },

    // ---- Option validation ----
    /// The theta list must be non-empty.
    EmptyThetas,

    /// A theta value is NaN or infinite.
    NonFiniteTheta { index: usize, value: f64 },

    /// The per-column metric list must be empty or have one entry per
    /// manifold column.
    MetricLengthMismatch { expected: usize, actual: usize },

    /// missing_distance must be finite and >= 0.
    InvalidMissingDistance { value: f64 },

    /// The inter-panel penalty must be finite and >= 0.
    InvalidPanelWeight { value: f64 },

    /// The Wasserstein aspect ratio must be finite and > 0.
    InvalidAspectRatio { value: f64 },

    /// An algorithm name failed to parse at a host boundary.
    UnknownAlgorithm { name: String },

    /// A distance name failed to parse at a host boundary.
    UnknownDistance { name: String },

    /// A metric name failed to parse at a host boundary.
    UnknownMetric { name: String },

    // ---- Replay files ----
    /// The dump file's major version is newer than this reader supports.
    UnsupportedReplayVersion { found: u32, supported: u32 },

    /// The dump file failed to decode (missing mandatory field, malformed
    /// payload).
    MalformedReplayFile { detail: String },

    /// The dump file could not be read or written.
    ReplayIo { detail: String },

    // ---- Internal ----
    /// The run thread died before delivering a result.
    Internal { detail: String },
}

impl std::error::Error for EdmError {}

impl std::fmt::Display for EdmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Raw-data validation ----
            EdmError::EmptySeries => {
                write!(f, "Input series is empty.")
            }
            EdmError::ColumnLengthMismatch { column, expected, actual } => {
                write!(f, "Column '{column}' has length {actual}; expected {expected}.")
            }
            EdmError::FilterLengthMismatch { expected, actual } => {
                write!(f, "Row filter has length {actual}; expected {expected}.")
            }
            // ---- Embedding parameters ----
            EdmError::InvalidEmbeddingDim { e } => {
                write!(f, "Embedding dimension E must be at least 1; got {e}.")
            }
            EdmError::InvalidTau { tau } => {
                write!(f, "Lag step tau must be at least 1; got {tau}.")
            }
            EdmError::TooManyLaggedExtras { num_extras, num_extras_lagged } => {
                write!(
                    f,
                    "Cannot lag-embed {num_extras_lagged} extras when only {num_extras} are supplied."
                )
            }
            // ---- Option validation ----
            EdmError::EmptyThetas => {
                write!(f, "At least one theta value is required.")
            }
            EdmError::NonFiniteTheta { index, value } => {
                write!(f, "Theta at index {index} is not finite: {value}")
            }
            EdmError::MetricLengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Per-column metric list has {actual} entries; expected {expected} (or empty for all-Diff)."
                )
            }
            EdmError::InvalidMissingDistance { value } => {
                write!(f, "missing_distance must be finite and non-negative; got {value}.")
            }
            EdmError::InvalidPanelWeight { value } => {
                write!(f, "Inter-panel penalty idw must be finite and non-negative; got {value}.")
            }
            EdmError::InvalidAspectRatio { value } => {
                write!(f, "Wasserstein aspect ratio must be finite and positive; got {value}.")
            }
            EdmError::UnknownAlgorithm { name } => {
                write!(f, "Invalid algorithm {name:?} (expected 'simplex' or 'smap').")
            }
            EdmError::UnknownDistance { name } => {
                write!(
                    f,
                    "Invalid distance {name:?} (expected 'euclidean', 'mae', or 'wasserstein')."
                )
            }
            EdmError::UnknownMetric { name } => {
                write!(f, "Invalid metric {name:?} (expected 'diff' or 'checksame').")
            }
            // ---- Replay files ----
            EdmError::UnsupportedReplayVersion { found, supported } => {
                write!(
                    f,
                    "Replay file version {found} is newer than the supported version {supported}."
                )
            }
            EdmError::MalformedReplayFile { detail } => {
                write!(f, "Malformed replay file: {detail}")
            }
            EdmError::ReplayIo { detail } => {
                write!(f, "Replay file I/O failed: {detail}")
            }
            // ---- Internal ----
            EdmError::Internal { detail } => {
                write!(f, "Internal error: {detail}")
            }
        }
    }
}

/// Convert an [`EdmError`] into a Python `ValueError` with the error message.
///
/// This is used at the Rust↔Python boundary to surface domain errors cleanly.
#[cfg(feature = "python-bindings")]
impl std::convert::From<EdmError> for PyErr {
    fn from(err: EdmError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
