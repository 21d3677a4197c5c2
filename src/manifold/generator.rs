//! Time-delay embedding generator.
//!
//! Purpose
//! -------
//! Turn raw time-stamped columns into dense blocks of embedded points. The
//! generator owns the raw series (time, primary, target, optional
//! co-prediction primary, optional panel ids, extras) together with the
//! embedding parameters, and stays pure metadata until asked to materialize
//! a [`Manifold`] for a specific boolean row filter.
//!
//! Key behaviors
//! -------------
//! - Lag lookups walk raw observation indices in steps of `tau`; walking off
//!   the start of history, crossing a panel boundary (panel mode), or
//!   landing on a MISSING cell writes the sentinel instead of a value.
//! - Optional `dt` columns embed the inter-observation time gaps, scaled by
//!   `dt_weight`, optionally prefixed with the forward gap (`add_dt0`) and
//!   optionally accumulated since the anchor (`cumulative_dt`).
//! - The first `num_extras_lagged` extras are lag-embedded like the primary;
//!   the rest contribute one unlagged, current-row column each.
//! - With co-prediction data attached, building with `prediction = true`
//!   embeds the alternate primary instead of `x` (targets are unchanged).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every raw column has the same length as the primary series; this is
//!   checked at construction and attach time, never during embedding.
//! - The output depends only on the raw inputs, the parameters, and the
//!   filter: building twice with the same filter yields equal blocks.
//! - A filter that selects zero rows is not an error; downstream code
//!   reports insufficient neighbors per prediction slot instead.
//!
//! Conventions
//! -----------
//! - Derived widths follow the embedding algebra:
//!   `E_dt = use_dt · (E − 1 + add_dt0)`,
//!   `E_lagged_extras = num_extras_lagged · E`,
//!   `E_extras = num_extras + num_extras_lagged · (E − 1)`,
//!   `E_actual = E + E_dt + E_extras`.
//! - Sentinel comparisons are by exact equality throughout.
//!
//! Testing notes
//! -------------
//! - Unit tests below pin the lag arithmetic, the three dt layouts (plain,
//!   dt0, cumulative), panel-boundary and missing propagation, the extras
//!   layout, co-prediction selection, and build idempotence.
use crate::errors::{EdmError, EdmResult};
use crate::manifold::block::Manifold;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Raw columns plus embedding parameters; materializes [`Manifold`] blocks.
///
/// Purpose
/// -------
/// Carry everything needed to embed any subset of the raw rows, so that the
/// library and query blocks of one run are guaranteed to share column
/// semantics.
///
/// Fields
/// ------
/// - `t`, `x`, `y`: time, primary, and target columns (length `N`).
/// - `co_x`: optional alternate primary for co-prediction.
/// - `extras`: additional variables; the first `num_extras_lagged` of them
///   are lag-embedded.
/// - `panel_ids`: optional integer panel per row; lags never cross a panel
///   boundary and the distance engines may penalize cross-panel pairs.
/// - `e`, `tau`: lag count and lag step of the primary embedding.
/// - `use_dt`, `add_dt0`, `cumulative_dt`, `dt_weight`: inter-observation
///   gap embedding controls.
/// - `missing`: the MISSING sentinel for this run.
///
/// Invariants
/// ----------
/// - `e >= 1`, `tau >= 1`, `num_extras_lagged <= extras.len()`, and all
///   columns share length `N >= 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifoldGenerator {
    t: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
    co_x: Option<Vec<f64>>,
    extras: Vec<Vec<f64>>,
    panel_ids: Option<Vec<i32>>,
    e: usize,
    tau: usize,
    use_dt: bool,
    add_dt0: bool,
    cumulative_dt: bool,
    dt_weight: f64,
    num_extras_lagged: usize,
    missing: f64,
}

impl ManifoldGenerator {
    /// Construct a generator over validated raw columns.
    ///
    /// Parameters
    /// ----------
    /// - `t`, `x`, `y`: time, primary, and target columns; must share a
    ///   non-zero length. Any cell may be the sentinel.
    /// - `extras`: additional variables, each the same length as `x`.
    /// - `num_extras_lagged`: how many leading extras are lag-embedded.
    /// - `e`, `tau`: embedding dimension and lag step.
    /// - `missing`: the MISSING sentinel value for this run.
    ///
    /// Returns
    /// -------
    /// `EdmResult<ManifoldGenerator>` with dt, co-prediction, and panel data
    /// left unattached.
    ///
    /// Errors
    /// ------
    /// - [`EdmError::EmptySeries`] when `x` is empty.
    /// - [`EdmError::InvalidEmbeddingDim`] / [`EdmError::InvalidTau`] on
    ///   out-of-range parameters.
    /// - [`EdmError::ColumnLengthMismatch`] when `t`, `y`, or an extra
    ///   disagrees with `x` in length.
    /// - [`EdmError::TooManyLaggedExtras`] when `num_extras_lagged`
    ///   exceeds the number of extras supplied.
    pub fn new(
        t: Vec<f64>, x: Vec<f64>, y: Vec<f64>, extras: Vec<Vec<f64>>, num_extras_lagged: usize,
        e: usize, tau: usize, missing: f64,
    ) -> EdmResult<ManifoldGenerator> {
        let n = x.len();
        if n == 0 {
            return Err(EdmError::EmptySeries);
        }
        if e == 0 {
            return Err(EdmError::InvalidEmbeddingDim { e });
        }
        if tau == 0 {
            return Err(EdmError::InvalidTau { tau });
        }
        check_column("t", n, t.len())?;
        check_column("y", n, y.len())?;
        for extra in &extras {
            check_column("extra", n, extra.len())?;
        }
        if num_extras_lagged > extras.len() {
            return Err(EdmError::TooManyLaggedExtras {
                num_extras: extras.len(),
                num_extras_lagged,
            });
        }
        Ok(ManifoldGenerator {
            t,
            x,
            y,
            co_x: None,
            extras,
            panel_ids: None,
            e,
            tau,
            use_dt: false,
            add_dt0: false,
            cumulative_dt: false,
            dt_weight: 0.0,
            num_extras_lagged,
            missing,
        })
    }

    /// Attach an alternate primary series for co-prediction.
    ///
    /// # Errors
    /// - [`EdmError::ColumnLengthMismatch`] when the column length disagrees
    ///   with the primary series.
    pub fn add_coprediction_data(&mut self, co_x: Vec<f64>) -> EdmResult<()> {
        check_column("co_x", self.x.len(), co_x.len())?;
        self.co_x = Some(co_x);
        Ok(())
    }

    /// Enable dt embedding of the inter-observation time gaps.
    pub fn add_dt_data(&mut self, dt_weight: f64, add_dt0: bool, cumulative_dt: bool) {
        self.use_dt = true;
        self.add_dt0 = add_dt0;
        self.cumulative_dt = cumulative_dt;
        self.dt_weight = dt_weight;
    }

    /// Attach panel ids; lags stop at panel boundaries from here on.
    ///
    /// # Errors
    /// - [`EdmError::ColumnLengthMismatch`] when the column length disagrees
    ///   with the primary series.
    pub fn add_panel_ids(&mut self, panel_ids: Vec<i32>) -> EdmResult<()> {
        check_column("panel", self.x.len(), panel_ids.len())?;
        self.panel_ids = Some(panel_ids);
        Ok(())
    }

    // ---- Derived widths ----------------------------------------------------

    pub fn e(&self) -> usize {
        self.e
    }

    pub fn e_dt(&self) -> usize {
        if self.use_dt { self.e - 1 + usize::from(self.add_dt0) } else { 0 }
    }

    pub fn e_extras(&self) -> usize {
        self.extras.len() + self.num_extras_lagged * (self.e - 1)
    }

    pub fn e_lagged_extras(&self) -> usize {
        self.num_extras_lagged * self.e
    }

    pub fn e_actual(&self) -> usize {
        self.e + self.e_dt() + self.e_extras()
    }

    pub fn num_extras(&self) -> usize {
        self.extras.len()
    }

    pub fn num_extras_lagged(&self) -> usize {
        self.num_extras_lagged
    }

    /// Number of raw observations.
    pub fn num_obs(&self) -> usize {
        self.x.len()
    }

    /// The MISSING sentinel of this run.
    pub fn missing(&self) -> f64 {
        self.missing
    }

    /// Whether co-prediction data is attached.
    pub fn has_coprediction_data(&self) -> bool {
        self.co_x.is_some()
    }

    /// Whether panel ids are attached.
    pub fn panel_mode(&self) -> bool {
        self.panel_ids.is_some()
    }

    // ---- Materialization ---------------------------------------------------

    /// Materialize a [`Manifold`] for the rows selected by `filter`.
    ///
    /// Parameters
    /// ----------
    /// - `filter`: one flag per raw row; `true` rows become points, in raw
    ///   order.
    /// - `prediction`: embed the co-prediction primary instead of `x` when
    ///   co-prediction data is attached (query blocks of a co-prediction
    ///   run); ignored otherwise.
    ///
    /// Returns
    /// -------
    /// A block with `popcount(filter)` rows and `E_actual` columns whose
    /// panel id and raw index per row come from the selected raw row.
    ///
    /// Errors
    /// ------
    /// - [`EdmError::FilterLengthMismatch`] when the filter length disagrees
    ///   with the raw series.
    pub fn create_manifold(&self, filter: &[bool], prediction: bool) -> EdmResult<Manifold> {
        let n = self.x.len();
        if filter.len() != n {
            return Err(EdmError::FilterLengthMismatch { expected: n, actual: filter.len() });
        }

        let primary: &[f64] = match (&self.co_x, prediction) {
            (Some(co_x), true) => co_x,
            _ => &self.x,
        };

        let e_actual = self.e_actual();
        let nobs = filter.iter().filter(|&&keep| keep).count();

        let mut data = Array2::<f64>::zeros((nobs, e_actual));
        let mut y = Array1::<f64>::zeros(nobs);
        let mut raw_index = Vec::with_capacity(nobs);
        let mut panel_ids =
            Vec::with_capacity(if self.panel_ids.is_some() { nobs } else { 0 });

        let mut i = 0;
        for (r, &keep) in filter.iter().enumerate() {
            if !keep {
                continue;
            }
            {
                let mut row = data.row_mut(i);
                let mut col = 0;

                for lag in 0..self.e {
                    row[col] = self.lagged(primary, r, lag);
                    col += 1;
                }
                if self.use_dt {
                    col = self.fill_dt(&mut row, col, r);
                }
                for z in 0..self.num_extras_lagged {
                    for lag in 0..self.e {
                        row[col] = self.lagged(&self.extras[z], r, lag);
                        col += 1;
                    }
                }
                for z in self.num_extras_lagged..self.extras.len() {
                    row[col] = self.extras[z][r];
                    col += 1;
                }
                debug_assert_eq!(col, e_actual);
            }

            y[i] = self.y[r];
            raw_index.push(r);
            if let Some(panels) = &self.panel_ids {
                panel_ids.push(panels[r]);
            }
            i += 1;
        }

        Ok(Manifold::new(
            data,
            y,
            panel_ids,
            raw_index,
            self.e,
            self.e_dt(),
            self.e_extras(),
            self.e_lagged_extras(),
            self.missing,
        ))
    }

    // ---- Lag lookups -------------------------------------------------------

    /// Raw index `lag` embedding steps before `r`, or `None` when the lookup
    /// walks off the start of history or crosses a panel boundary.
    fn lagged_index(&self, r: usize, lag: usize) -> Option<usize> {
        let steps = lag * self.tau;
        if steps > r {
            return None;
        }
        let idx = r - steps;
        if let Some(panels) = &self.panel_ids {
            if panels[idx] != panels[r] {
                return None;
            }
        }
        Some(idx)
    }

    /// Lagged value of `series` at `r`, or the sentinel when the index is
    /// undefined. A raw sentinel cell passes through unchanged.
    fn lagged(&self, series: &[f64], r: usize, lag: usize) -> f64 {
        match self.lagged_index(r, lag) {
            Some(idx) => series[idx],
            None => self.missing,
        }
    }

    /// Next raw observation after `r` inside the same panel.
    fn next_in_panel(&self, r: usize) -> Option<usize> {
        match &self.panel_ids {
            Some(panels) => (r + 1..self.x.len()).find(|&idx| panels[idx] == panels[r]),
            None => (r + 1 < self.x.len()).then_some(r + 1),
        }
    }

    /// Time stamp at the raw index, or `None` when the stamp itself is the
    /// sentinel.
    fn time_at(&self, idx: usize) -> Option<f64> {
        let v = self.t[idx];
        (v != self.missing).then_some(v)
    }

    /// Write the dt block for the point anchored at raw row `r`; returns the
    /// next free column.
    ///
    /// The gap sequence starts with the forward gap to the next in-panel
    /// observation when `add_dt0` is set, then runs over the gaps between
    /// consecutive x-lag time stamps. With `cumulative_dt` each emitted
    /// entry is the running sum of the gaps so far; a missing gap poisons
    /// every later cumulative entry. Every entry is scaled by `dt_weight`.
    fn fill_dt(&self, row: &mut ndarray::ArrayViewMut1<'_, f64>, mut col: usize, r: usize) -> usize {
        let mut cumulative = 0.0;
        let mut poisoned = false;

        let mut emit = |row: &mut ndarray::ArrayViewMut1<'_, f64>, col: &mut usize,
                        gap: Option<f64>| {
            let value = match gap {
                Some(g) if !poisoned => {
                    cumulative += g;
                    let out = if self.cumulative_dt { cumulative } else { g };
                    self.dt_weight * out
                }
                _ => {
                    poisoned = true;
                    self.missing
                }
            };
            row[*col] = value;
            *col += 1;
        };

        if self.add_dt0 {
            let forward = self
                .next_in_panel(r)
                .and_then(|next| Some(self.time_at(next)? - self.time_at(r)?));
            emit(row, &mut col, forward);
        }
        for lag in 1..self.e {
            let gap = self.lagged_index(r, lag - 1).and_then(|newer| {
                let older = self.lagged_index(r, lag)?;
                Some(self.time_at(newer)? - self.time_at(older)?)
            });
            emit(row, &mut col, gap);
        }
        col
    }
}

fn check_column(column: &'static str, expected: usize, actual: usize) -> EdmResult<()> {
    if expected != actual {
        return Err(EdmError::ColumnLengthMismatch { column, expected, actual });
    }
    Ok(())
}
