//! Exact discrete optimal transport with uniform marginals.
//!
//! Purpose
//! -------
//! Solve the balanced transportation problem behind the Wasserstein curve
//! distance: given a nonnegative `n × m` cost matrix and uniform marginals
//! (`1/n` per row, `1/m` per column), return the optimal transport cost.
//! The contract is deliberately narrow — one routine, one number out — so
//! the distance engine can treat it as a black box.
//!
//! Key behaviors
//! -------------
//! - North-west-corner initial basis (always `n + m − 1` basic cells,
//!   degenerate zero allocations included), then MODI pivoting with Bland's
//!   entering rule until no reduced cost is negative.
//! - Bounded iteration count: the solver stops after a fixed pivot budget
//!   and reports the best basis found, which for these tiny matrices is the
//!   optimum in practice long before the bound.
//! - Non-finite costs short-circuit to NaN; the caller drops non-finite
//!   distances.
//!
//! Invariants & assumptions
//! ------------------------
//! - The basis stays a spanning tree of the bipartite row/column graph, so
//!   potentials are well-defined and the pivot cycle is unique.
//! - Matrix dimensions are small (at most the embedding dimension per
//!   side); everything is dense and `O(n · m)` per pivot.
use ndarray::Array2;

const MAX_PIVOTS: usize = 10_000;

/// Optimal cost of transporting uniform row mass to uniform column mass
/// under the given cost matrix.
///
/// Parameters
/// ----------
/// - `cost`: nonnegative `n × m` cost matrix with `n, m >= 1`.
///
/// Returns
/// -------
/// The optimal objective value; NaN when any cost entry is non-finite.
pub fn uniform_transport_cost(cost: &Array2<f64>) -> f64 {
    let (n, m) = cost.dim();
    debug_assert!(n > 0 && m > 0);
    if cost.iter().any(|c| !c.is_finite()) {
        return f64::NAN;
    }

    let mut basis = Basis::north_west(cost, n, m);
    let tolerance = 1e-12 * cost.iter().fold(1.0_f64, |acc, &c| acc.max(c.abs()));

    for _ in 0..MAX_PIVOTS {
        let (u, v) = basis.potentials(cost);
        let Some((ei, ej)) = basis.entering_cell(cost, &u, &v, tolerance) else {
            break;
        };
        if !basis.pivot(ei, ej) {
            break;
        }
    }

    basis.objective(cost)
}

/// Basic feasible solution of the transportation problem: a flow grid plus
/// the basic-cell marker grid, kept at exactly `n + m − 1` basics.
struct Basis {
    n: usize,
    m: usize,
    flow: Array2<f64>,
    basic: Array2<bool>,
}

impl Basis {
    /// North-west-corner start. Advancing exactly one index per allocation
    /// yields `n + m − 1` basic cells, with explicit zero allocations at
    /// degenerate ties.
    fn north_west(_cost: &Array2<f64>, n: usize, m: usize) -> Basis {
        let mut flow = Array2::<f64>::zeros((n, m));
        let mut basic = Array2::from_elem((n, m), false);
        let mut supply = vec![1.0 / n as f64; n];
        let mut demand = vec![1.0 / m as f64; m];
        let eps = 1e-12 / (n * m) as f64;

        let (mut i, mut j) = (0, 0);
        loop {
            let q = supply[i].min(demand[j]);
            flow[[i, j]] = q;
            basic[[i, j]] = true;
            supply[i] -= q;
            demand[j] -= q;
            if i == n - 1 && j == m - 1 {
                break;
            }
            if supply[i] <= eps && i < n - 1 {
                i += 1;
            } else {
                j += 1;
            }
        }
        Basis { n, m, flow, basic }
    }

    /// Dual potentials `u`, `v` with `u[i] + v[j] = c[i][j]` on every basic
    /// cell, propagated over the basis tree from `u[0] = 0`. A disconnected
    /// component (possible only through numeric degeneracy) is re-anchored
    /// at zero so the walk always terminates.
    fn potentials(&self, cost: &Array2<f64>) -> (Vec<f64>, Vec<f64>) {
        let mut u = vec![f64::NAN; self.n];
        let mut v = vec![f64::NAN; self.m];
        let mut row_queue: Vec<usize> = Vec::with_capacity(self.n);
        let mut col_queue: Vec<usize> = Vec::with_capacity(self.m);

        for anchor in 0..self.n {
            if !u[anchor].is_nan() {
                continue;
            }
            u[anchor] = 0.0;
            row_queue.push(anchor);
            while !(row_queue.is_empty() && col_queue.is_empty()) {
                if let Some(i) = row_queue.pop() {
                    for j in 0..self.m {
                        if self.basic[[i, j]] && v[j].is_nan() {
                            v[j] = cost[[i, j]] - u[i];
                            col_queue.push(j);
                        }
                    }
                }
                if let Some(j) = col_queue.pop() {
                    for i in 0..self.n {
                        if self.basic[[i, j]] && u[i].is_nan() {
                            u[i] = cost[[i, j]] - v[j];
                            row_queue.push(i);
                        }
                    }
                }
            }
        }
        for value in v.iter_mut() {
            if value.is_nan() {
                *value = 0.0;
            }
        }
        (u, v)
    }

    /// First non-basic cell (row-major) with a reduced cost below
    /// `-tolerance` — Bland's rule, which also rules out pivot cycling.
    fn entering_cell(
        &self, cost: &Array2<f64>, u: &[f64], v: &[f64], tolerance: f64,
    ) -> Option<(usize, usize)> {
        for i in 0..self.n {
            for j in 0..self.m {
                if !self.basic[[i, j]] && cost[[i, j]] - u[i] - v[j] < -tolerance {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Bring `(ei, ej)` into the basis: find the unique alternating cycle it
    /// closes, shift the minimum odd-position flow around it, and drop the
    /// cell that reaches zero. Returns `false` when no closed cycle exists
    /// (a numerically degenerate basis), which stops the pivoting.
    fn pivot(&mut self, ei: usize, ej: usize) -> bool {
        let Some(cycle) = self.find_cycle(ei, ej) else {
            return false;
        };

        let mut theta = f64::INFINITY;
        for (pos, &(i, j)) in cycle.iter().enumerate() {
            if pos % 2 == 1 {
                theta = theta.min(self.flow[[i, j]]);
            }
        }

        let mut leaving: Option<(usize, usize)> = None;
        for (pos, &(i, j)) in cycle.iter().enumerate() {
            if pos % 2 == 0 {
                self.flow[[i, j]] += theta;
            } else {
                self.flow[[i, j]] -= theta;
                if leaving.is_none() && self.flow[[i, j]] <= theta * 1e-12 + f64::MIN_POSITIVE {
                    leaving = Some((i, j));
                }
            }
        }
        // Degenerate theta can leave no odd cell at exact zero; fall back to
        // the smallest odd-position flow so the basis size stays fixed.
        let leaving = leaving.unwrap_or_else(|| {
            let mut best = cycle[1];
            let mut best_flow = f64::INFINITY;
            for (pos, &(i, j)) in cycle.iter().enumerate() {
                if pos % 2 == 1 && self.flow[[i, j]] < best_flow {
                    best_flow = self.flow[[i, j]];
                    best = (i, j);
                }
            }
            best
        });

        self.basic[[ei, ej]] = true;
        self.basic[[leaving.0, leaving.1]] = false;
        self.flow[[leaving.0, leaving.1]] = 0.0;
        true
    }

    /// The unique cycle in basis ∪ {entering}: cross out every cell that is
    /// alone in its row or column until only the cycle remains, then walk it
    /// starting from the entering cell, alternating row and column moves.
    fn find_cycle(&self, ei: usize, ej: usize) -> Option<Vec<(usize, usize)>> {
        let mut active = self.basic.clone();
        active[[ei, ej]] = true;

        let mut row_counts = vec![0usize; self.n];
        let mut col_counts = vec![0usize; self.m];
        for i in 0..self.n {
            for j in 0..self.m {
                if active[[i, j]] {
                    row_counts[i] += 1;
                    col_counts[j] += 1;
                }
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..self.n {
                for j in 0..self.m {
                    if active[[i, j]] && (row_counts[i] < 2 || col_counts[j] < 2) {
                        active[[i, j]] = false;
                        row_counts[i] -= 1;
                        col_counts[j] -= 1;
                        changed = true;
                    }
                }
            }
        }

        // Walk the cycle: each remaining row and column holds exactly two
        // cycle cells, so every step is forced.
        let mut cycle = vec![(ei, ej)];
        let (mut i, mut j) = (ei, ej);
        let mut along_row = true;
        loop {
            let next = if along_row {
                (0..self.m).find(|&jj| jj != j && active[[i, jj]]).map(|jj| (i, jj))
            } else {
                (0..self.n).find(|&ii| ii != i && active[[ii, j]]).map(|ii| (ii, j))
            };
            let (ni, nj) = next?;
            if (ni, nj) == (ei, ej) {
                break;
            }
            cycle.push((ni, nj));
            i = ni;
            j = nj;
            along_row = !along_row;
        }
        Some(cycle)
    }

    fn objective(&self, cost: &Array2<f64>) -> f64 {
        let mut total = 0.0;
        for i in 0..self.n {
            for j in 0..self.m {
                if self.basic[[i, j]] {
                    total += self.flow[[i, j]] * cost[[i, j]];
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-10;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Trivial shapes (1×1, single row) where the optimum is closed-form.
    // - Square and rectangular instances with hand-checked optima,
    //   including one where the NW-corner start is not optimal.
    // - Degenerate equal-marginal instances (n == m) that force zero basics.
    // - The NaN short-circuit for non-finite costs.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // With a single source and uniform demands the optimum is the mean of
    // the costs; with one cell it is the cost itself.
    fn single_row_and_single_cell_are_closed_form() {
        let c = array![[5.0]];
        assert!((uniform_transport_cost(&c) - 5.0).abs() < TOL);

        let c = array![[3.0, 6.0, 9.0]];
        assert!((uniform_transport_cost(&c) - 6.0).abs() < TOL);
    }

    #[test]
    // Purpose
    // -------
    // A 2×2 instance where the diagonal matching is strictly better than
    // the anti-diagonal one the NW corner partially prefers.
    //
    // Given
    // -----
    // - C = [[1, 3], [4, 2]], marginals (1/2, 1/2) both sides.
    //
    // Expect
    // ------
    // - Optimal plan puts 1/2 on each diagonal cell: cost 1.5.
    fn two_by_two_picks_the_cheap_matching() {
        let c = array![[1.0, 3.0], [4.0, 2.0]];
        assert!((uniform_transport_cost(&c) - 1.5).abs() < TOL);
    }

    #[test]
    // Purpose
    // -------
    // A permutation-shaped cost matrix must reach zero: all mass travels
    // along the zero diagonal even though NW corner starts elsewhere.
    fn permutation_costs_reach_zero() {
        let c = array![[0.0, 99.0], [99.0, 0.0]];
        assert!(uniform_transport_cost(&c).abs() < TOL);

        let c = array![[7.0, 0.0, 7.0], [0.0, 7.0, 7.0], [7.0, 7.0, 0.0]];
        assert!(uniform_transport_cost(&c).abs() < TOL);
    }

    #[test]
    // Purpose
    // -------
    // Rectangular instance with a hand-computed optimum.
    //
    // Given
    // -----
    // - C = [[1, 10, 10], [10, 1, 1]], supplies 1/2 each, demands 1/3 each.
    //
    // Expect
    // ------
    // - Row 1 ships its full 1/2 at cost 1; row 0 ships 1/3 at cost 1 and
    //   the remaining 1/6 at cost 10: total 2.5.
    fn rectangular_instance_matches_hand_solution() {
        let c = array![[1.0, 10.0, 10.0], [10.0, 1.0, 1.0]];
        assert!((uniform_transport_cost(&c) - 2.5).abs() < TOL);
    }

    #[test]
    // Purpose
    // -------
    // Equal marginals (n == m) make every NW-corner allocation exhaust a
    // row and a column simultaneously — the fully degenerate case. The
    // solver must still leave the initial diagonal when it is expensive.
    //
    // Given
    // -----
    // - C = [[5, 1, 5], [1, 5, 5], [5, 5, 1]] (a permutation of cheap cells
    //   off the main diagonal).
    //
    // Expect
    // ------
    // - Optimal cost 1 (1/3 mass on each cheap cell), not the diagonal's 11/3.
    fn degenerate_square_instance_escapes_the_diagonal() {
        let c = array![[5.0, 1.0, 5.0], [1.0, 5.0, 5.0], [5.0, 5.0, 1.0]];
        assert!((uniform_transport_cost(&c) - 1.0).abs() < TOL);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite costs cannot be optimized over; the solver reports NaN and
    // the caller drops the candidate.
    fn non_finite_costs_short_circuit_to_nan() {
        let c = array![[1.0, f64::INFINITY], [1.0, 1.0]];
        assert!(uniform_transport_cost(&c).is_nan());
    }
}
