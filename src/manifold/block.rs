//! Dense block of embedded points.
//!
//! Purpose
//! -------
//! Hold the materialized output of a [`ManifoldGenerator`] run: a row-major
//! matrix of embedded points plus the aligned target, panel-id, and
//! raw-index vectors. The block is immutable once built and is shared
//! read-only by every worker for the lifetime of a run.
//!
//! Key behaviors
//! -------------
//! - Column layout per point, left to right:
//!   `[ x-lags (E) | dt-lags (E_dt) | lagged extras | unlagged extras ]`.
//! - Entries that could not be produced from the raw series equal the
//!   MISSING sentinel; the matrix is dense but sparse in meaning.
//! - The lagged prefix of a row can also be read as a small multivariate
//!   curve (`curve_dims` rows of length `E`) for the Wasserstein engine; a
//!   dt row shorter than `E` is padded with the sentinel.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data` always has exactly `e_actual` columns, and `y`, `panel_ids`
//!   (when present), and `raw_index` all have `nobs` entries.
//! - Sentinel comparisons are by exact equality; no arithmetic is performed
//!   on sentinel entries.
//!
//! Testing notes
//! -------------
//! - The accessors here are exercised indirectly by the generator and
//!   distance tests; a small direct test pins the curve view layout.
//!
//! [`ManifoldGenerator`]: super::generator::ManifoldGenerator
use ndarray::{Array1, Array2, ArrayView1};

/// Immutable embedded point set with aligned targets and panel ids.
///
/// Built once per run per row filter by the generator and then borrowed by
/// all workers. Row `i` corresponds to the `i`-th raw row selected by the
/// filter; `raw_index(i)` maps back to the raw observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    data: Array2<f64>,
    y: Array1<f64>,
    panel_ids: Vec<i32>,
    raw_index: Vec<usize>,
    e: usize,
    e_dt: usize,
    e_extras: usize,
    e_lagged_extras: usize,
    missing: f64,
}

impl Manifold {
    pub(crate) fn new(
        data: Array2<f64>, y: Array1<f64>, panel_ids: Vec<i32>, raw_index: Vec<usize>, e: usize,
        e_dt: usize, e_extras: usize, e_lagged_extras: usize, missing: f64,
    ) -> Manifold {
        Manifold { data, y, panel_ids, raw_index, e, e_dt, e_extras, e_lagged_extras, missing }
    }

    /// Entry at point `i`, column `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    /// Full row of point `i`.
    #[inline]
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Target associated with point `i`.
    #[inline]
    pub fn y(&self, i: usize) -> f64 {
        self.y[i]
    }

    /// All targets, aligned with the rows.
    pub fn targets(&self) -> &Array1<f64> {
        &self.y
    }

    /// Panel id of point `i` (0 when panel mode is off).
    #[inline]
    pub fn panel(&self, i: usize) -> i32 {
        if self.panel_ids.is_empty() { 0 } else { self.panel_ids[i] }
    }

    /// Raw observation index that produced point `i`.
    #[inline]
    pub fn raw_index(&self, i: usize) -> usize {
        self.raw_index[i]
    }

    /// `j`-th unlagged extra of point `i`.
    #[inline]
    pub fn unlagged_extra(&self, i: usize, j: usize) -> f64 {
        self.data[[i, self.e + self.e_dt + self.e_lagged_extras + j]]
    }

    pub fn nobs(&self) -> usize {
        self.data.nrows()
    }

    pub fn e(&self) -> usize {
        self.e
    }

    pub fn e_dt(&self) -> usize {
        self.e_dt
    }

    pub fn e_extras(&self) -> usize {
        self.e_extras
    }

    pub fn e_lagged_extras(&self) -> usize {
        self.e_lagged_extras
    }

    pub fn e_actual(&self) -> usize {
        self.data.ncols()
    }

    pub fn num_unlagged_extras(&self) -> usize {
        self.e_extras - self.e_lagged_extras
    }

    /// The MISSING sentinel this block was built with.
    #[inline]
    pub fn missing(&self) -> f64 {
        self.missing
    }

    /// Whether any entry of point `i` is the sentinel.
    pub fn any_missing(&self, i: usize) -> bool {
        self.row(i).iter().any(|&v| v == self.missing)
    }

    /// Count of non-sentinel entries of point `i`.
    pub fn num_not_missing(&self, i: usize) -> usize {
        self.row(i).iter().filter(|&&v| v != self.missing).count()
    }

    /// Spread of the non-sentinel entries over the whole block (0 when every
    /// entry is the sentinel).
    pub fn range(&self) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in self.data.iter() {
            if v != self.missing {
                min = min.min(v);
                max = max.max(v);
            }
        }
        if min > max { 0.0 } else { max - min }
    }

    // ---- Lagged-curve view (Wasserstein) -----------------------------------

    /// Number of rows when the lagged prefix of a point is read as a short
    /// multivariate curve: the primary series, the dt row when present, and
    /// one row per lagged extra.
    pub fn curve_dims(&self) -> usize {
        1 + usize::from(self.e_dt > 0) + self.num_lagged_extra_vars()
    }

    /// Number of lag-embedded extra variables.
    pub fn num_lagged_extra_vars(&self) -> usize {
        self.e_lagged_extras / self.e
    }

    /// Curve entry for point `i` at dimension `dim`, lag position `pos`
    /// (`pos < E`). A dt row shorter than `E` reads as the sentinel past its
    /// end.
    pub fn curve_value(&self, i: usize, dim: usize, pos: usize) -> f64 {
        let has_dt = self.e_dt > 0;
        if dim == 0 {
            self.data[[i, pos]]
        } else if has_dt && dim == 1 {
            if pos < self.e_dt { self.data[[i, self.e + pos]] } else { self.missing }
        } else {
            let extra = dim - 1 - usize::from(has_dt);
            self.data[[i, self.e + self.e_dt + extra * self.e + pos]]
        }
    }

    /// First manifold column of curve dimension `dim`; used to pick the
    /// per-dimension comparison mode (all lags of one variable share their
    /// column metric).
    pub fn curve_dim_column(&self, dim: usize) -> usize {
        let has_dt = self.e_dt > 0;
        if dim == 0 {
            0
        } else if has_dt && dim == 1 {
            self.e
        } else {
            let extra = dim - 1 - usize::from(has_dt);
            self.e + self.e_dt + extra * self.e
        }
    }

    /// First manifold column of unlagged extra `j`.
    pub fn unlagged_extra_column(&self, j: usize) -> usize {
        self.e + self.e_dt + self.e_lagged_extras + j
    }

    /// Whether any dimension of the curve is the sentinel at lag position
    /// `pos` of point `i`.
    pub fn curve_position_missing(&self, i: usize, pos: usize) -> bool {
        (0..self.curve_dims()).any(|dim| self.curve_value(i, dim, pos) == self.missing)
    }
}
