//! Run options for EDM predictions.
//!
//! This module defines [`EdmOptions`], a single struct that bundles the
//! configuration of one prediction run: the algorithm, neighbor count,
//! smoothing parameters, distance metric and per-column comparison modes,
//! the missing-value policy, panel handling, and the threading knobs.
//!
//! Design goals:
//! - Keep all run knobs in one place, as plain data with tag enums for the
//!   variants (no trait objects in the inner loops).
//! - Validate cheaply at construction what can be validated without the
//!   manifold, and everything else in [`EdmOptions::validate`] once the
//!   manifold width is known.
//!
//! Notes:
//! - `k` keeps the host convention: `0` means "use `E_actual + 1`", negative
//!   means "use every surviving candidate".
//! - The per-column metric list may be left empty, which reads as `Diff`
//!   for every column.
use crate::errors::{EdmError, EdmResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default MISSING sentinel: the largest finite double.
///
/// Every comparison against the sentinel is by exact equality; predictor
/// outputs that cannot be produced are written as this same value.
pub const DEFAULT_MISSING: f64 = f64::MAX;

/// Prediction algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Exponentially weighted average of neighbor targets.
    Simplex,
    /// Weighted local linear regression with per-variable coefficients.
    SMap,
}

impl Algorithm {
    /// Fewest usable neighbors a slot needs before `force_compute` matters.
    ///
    /// S-map fits `E_actual + 1` coefficients, so it needs at least that many
    /// rows; Simplex can average a single neighbor.
    pub fn minimum_neighbors(&self, e_actual: usize) -> usize {
        match self {
            Algorithm::Simplex => 1,
            Algorithm::SMap => e_actual + 1,
        }
    }
}

impl FromStr for Algorithm {
    type Err = EdmError;

    fn from_str(name: &str) -> EdmResult<Algorithm> {
        match name.to_lowercase().as_str() {
            "simplex" => Ok(Algorithm::Simplex),
            "smap" | "s-map" => Ok(Algorithm::SMap),
            other => Err(EdmError::UnknownAlgorithm { name: other.to_string() }),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Simplex => write!(f, "simplex"),
            Algorithm::SMap => write!(f, "smap"),
        }
    }
}

/// Distance family used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceKind {
    /// Root of the per-column squared differences.
    Euclidean,
    /// Mean of the per-column absolute differences.
    MeanAbsoluteError,
    /// Optimal-transport distance between the two lagged sub-curves.
    Wasserstein,
}

impl FromStr for DistanceKind {
    type Err = EdmError;

    fn from_str(name: &str) -> EdmResult<DistanceKind> {
        match name.to_lowercase().as_str() {
            "euclidean" | "l2" => Ok(DistanceKind::Euclidean),
            "mae" | "mean_absolute_error" => Ok(DistanceKind::MeanAbsoluteError),
            "wasserstein" => Ok(DistanceKind::Wasserstein),
            other => Err(EdmError::UnknownDistance { name: other.to_string() }),
        }
    }
}

/// Per-column comparison mode.
///
/// Continuous columns subtract; unordered categorical columns only check
/// whether the two values differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Treat the column as continuous: contribute `M(i, j) − M'(q, j)`.
    Diff,
    /// Treat the column as categorical: contribute `[M(i, j) != M'(q, j)]`.
    CheckSame,
}

impl FromStr for Metric {
    type Err = EdmError;

    fn from_str(name: &str) -> EdmResult<Metric> {
        match name.to_lowercase().as_str() {
            "diff" => Ok(Metric::Diff),
            "checksame" | "check_same" => Ok(Metric::CheckSame),
            other => Err(EdmError::UnknownMetric { name: other.to_string() }),
        }
    }
}

/// Configuration of one prediction run.
///
/// Fields:
/// - `algorithm`, `thetas`: what to predict with, once per theta.
/// - `k`: neighbor count (see module notes for the 0 / negative convention).
/// - `distance`, `metrics`: distance family and per-column comparison modes.
/// - `missing_distance`: 0 drops any pair containing a missing component,
///   a positive value substitutes per missing component.
/// - `panel_mode`, `idw`: soft inter-panel distance penalty.
/// - `aspect_ratio`: plot aspect used to scale the dt row (Wasserstein only).
/// - `force_compute`: proceed below the neighbor minimum instead of marking
///   the slot insufficient.
/// - `save_coefficients`: keep the S-map coefficient rows.
/// - `report_stats`: reduce per-theta rho/MAE against the query targets.
/// - `num_threads` (0 = default) and `distribute_threads`: threading budget.
/// - `verbosity`: how chatty the io-sink trace is (0 silences it).
///
/// Construct with [`EdmOptions::new`], adjust the public fields, then the
/// driver calls [`EdmOptions::validate`] once the manifold width is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdmOptions {
    /// Prediction algorithm.
    pub algorithm: Algorithm,
    /// Number of neighbors; 0 means `E_actual + 1`, negative means all.
    pub k: i32,
    /// Smoothing parameters; the predictor runs once per entry.
    pub thetas: Vec<f64>,
    /// Distance family.
    pub distance: DistanceKind,
    /// Per-column comparison modes; empty means `Diff` everywhere.
    pub metrics: Vec<Metric>,
    /// Missing-component substitution distance (0 drops the pair).
    pub missing_distance: f64,
    /// Proceed even when fewer than the minimum neighbors survive.
    pub force_compute: bool,
    /// Whether panel ids partition the data.
    pub panel_mode: bool,
    /// Additive distance penalty for cross-panel candidate pairs.
    pub idw: f64,
    /// Aspect ratio for the Wasserstein time-axis rescaling.
    pub aspect_ratio: f64,
    /// Keep the fitted S-map coefficient rows.
    pub save_coefficients: bool,
    /// Reduce per-theta rho/MAE against the query targets after the run.
    pub report_stats: bool,
    /// Worker threads; 0 picks the machine default.
    pub num_threads: usize,
    /// Divide the thread budget when running inside an outer parallel region.
    pub distribute_threads: bool,
    /// Io-sink trace verbosity.
    pub verbosity: u8,
}

impl EdmOptions {
    /// Construct options with the given algorithm and theta list; every other
    /// knob starts at its conventional default (Euclidean distance, all-Diff
    /// metrics, `k = 0`, drop-missing policy, stats on, default threads).
    ///
    /// # Errors
    /// - [`EdmError::EmptyThetas`] if `thetas` is empty
    /// - [`EdmError::NonFiniteTheta`] if any theta is NaN or infinite
    pub fn new(algorithm: Algorithm, thetas: Vec<f64>) -> EdmResult<EdmOptions> {
        if thetas.is_empty() {
            return Err(EdmError::EmptyThetas);
        }
        for (index, &value) in thetas.iter().enumerate() {
            if !value.is_finite() {
                return Err(EdmError::NonFiniteTheta { index, value });
            }
        }
        Ok(EdmOptions {
            algorithm,
            k: 0,
            thetas,
            distance: DistanceKind::Euclidean,
            metrics: Vec::new(),
            missing_distance: 0.0,
            force_compute: false,
            panel_mode: false,
            idw: 0.0,
            aspect_ratio: 1.0,
            save_coefficients: false,
            report_stats: true,
            num_threads: 0,
            distribute_threads: false,
            verbosity: 0,
        })
    }

    /// Cross-field validation once the manifold width is known.
    ///
    /// The driver calls this before any work begins; a failure here aborts
    /// the run rather than producing per-slot codes.
    ///
    /// # Errors
    /// - [`EdmError::EmptyThetas`] / [`EdmError::NonFiniteTheta`] as in `new`
    ///   (replayed files bypass the constructor)
    /// - [`EdmError::MetricLengthMismatch`] if `metrics` is non-empty and not
    ///   `e_actual` long
    /// - [`EdmError::InvalidMissingDistance`], [`EdmError::InvalidPanelWeight`],
    ///   [`EdmError::InvalidAspectRatio`] on out-of-range scalars
    pub fn validate(&self, e_actual: usize) -> EdmResult<()> {
        if self.thetas.is_empty() {
            return Err(EdmError::EmptyThetas);
        }
        for (index, &value) in self.thetas.iter().enumerate() {
            if !value.is_finite() {
                return Err(EdmError::NonFiniteTheta { index, value });
            }
        }
        if !self.metrics.is_empty() && self.metrics.len() != e_actual {
            return Err(EdmError::MetricLengthMismatch {
                expected: e_actual,
                actual: self.metrics.len(),
            });
        }
        if !self.missing_distance.is_finite() || self.missing_distance < 0.0 {
            return Err(EdmError::InvalidMissingDistance { value: self.missing_distance });
        }
        if !self.idw.is_finite() || self.idw < 0.0 {
            return Err(EdmError::InvalidPanelWeight { value: self.idw });
        }
        if self.distance == DistanceKind::Wasserstein
            && (!self.aspect_ratio.is_finite() || self.aspect_ratio <= 0.0)
        {
            return Err(EdmError::InvalidAspectRatio { value: self.aspect_ratio });
        }
        Ok(())
    }

    /// Comparison mode for manifold column `column` (`Diff` when the list is
    /// empty).
    #[inline]
    pub fn metric_for(&self, column: usize) -> Metric {
        if self.metrics.is_empty() { Metric::Diff } else { self.metrics[column] }
    }

    /// Resolve `k` for a slot: negative takes every surviving candidate,
    /// zero reads as `e_actual + 1`, and the result is clamped to the
    /// surviving count.
    #[inline]
    pub fn effective_k(&self, e_actual: usize, surviving: usize) -> usize {
        if self.k < 0 {
            surviving
        } else if self.k == 0 {
            (e_actual + 1).min(surviving)
        } else {
            (self.k as usize).min(surviving)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Host-boundary parsing of algorithm / distance / metric names.
    // - Constructor and validate() rejection paths.
    // - The k resolution convention (negative, zero, clamping).
    //
    // They intentionally DO NOT cover:
    // - Interactions with a real manifold; those live with the driver tests.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Hosts hand over algorithm and distance names as strings; parsing must
    // be case-insensitive and reject unknown names with a useful error.
    //
    // Expect
    // ------
    // - Known spellings parse to the right tags.
    // - An unknown name surfaces EdmError::UnknownAlgorithm.
    fn name_parsing_accepts_known_spellings_and_rejects_others() {
        assert_eq!(Algorithm::from_str("Simplex").unwrap(), Algorithm::Simplex);
        assert_eq!(Algorithm::from_str("s-map").unwrap(), Algorithm::SMap);
        assert_eq!(DistanceKind::from_str("MAE").unwrap(), DistanceKind::MeanAbsoluteError);
        assert_eq!(Metric::from_str("checksame").unwrap(), Metric::CheckSame);

        match Algorithm::from_str("nearest") {
            Err(EdmError::UnknownAlgorithm { name }) => assert_eq!(name, "nearest"),
            other => panic!("expected UnknownAlgorithm, got {:?}", other),
        }
    }

    #[test]
    // Purpose
    // -------
    // An empty or non-finite theta list is a programmer error that must
    // abort before any work begins.
    //
    // Expect
    // ------
    // - new() rejects an empty list and a NaN entry.
    // - validate() re-applies the same checks for options that bypassed the
    //   constructor (e.g. decoded from a replay file).
    fn constructor_and_validate_reject_bad_thetas() {
        assert!(matches!(
            EdmOptions::new(Algorithm::Simplex, vec![]),
            Err(EdmError::EmptyThetas)
        ));
        assert!(matches!(
            EdmOptions::new(Algorithm::Simplex, vec![1.0, f64::NAN]),
            Err(EdmError::NonFiniteTheta { index: 1, .. })
        ));

        let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
        opts.thetas.clear();
        assert!(matches!(opts.validate(3), Err(EdmError::EmptyThetas)));
    }

    #[test]
    // Purpose
    // -------
    // validate() must catch a metric list of the wrong width and
    // out-of-range scalar knobs.
    //
    // Given
    // -----
    // - Options with two metrics against a manifold of width 3.
    // - Options with a negative missing_distance.
    // - Wasserstein options with a zero aspect ratio.
    //
    // Expect
    // ------
    // - Each case surfaces its dedicated error variant.
    fn validate_rejects_inconsistent_fields() {
        let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
        opts.metrics = vec![Metric::Diff, Metric::CheckSame];
        assert!(matches!(
            opts.validate(3),
            Err(EdmError::MetricLengthMismatch { expected: 3, actual: 2 })
        ));

        let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
        opts.missing_distance = -1.0;
        assert!(matches!(opts.validate(3), Err(EdmError::InvalidMissingDistance { .. })));

        let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
        opts.distance = DistanceKind::Wasserstein;
        opts.aspect_ratio = 0.0;
        assert!(matches!(opts.validate(3), Err(EdmError::InvalidAspectRatio { .. })));
    }

    #[test]
    // Purpose
    // -------
    // The k convention drives neighbor selection everywhere; pin it down.
    //
    // Expect
    // ------
    // - k < 0 takes all surviving candidates.
    // - k == 0 reads as E_actual + 1, clamped to the surviving count.
    // - k > 0 is clamped to the surviving count.
    fn effective_k_applies_host_convention() {
        let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();

        opts.k = -1;
        assert_eq!(opts.effective_k(4, 17), 17);

        opts.k = 0;
        assert_eq!(opts.effective_k(4, 17), 5);
        assert_eq!(opts.effective_k(4, 3), 3);

        opts.k = 10;
        assert_eq!(opts.effective_k(4, 7), 7);
        assert_eq!(opts.effective_k(4, 40), 10);
    }
}
