//! Integration tests for the EDM prediction pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path: raw columns through embedding, distance
//!   computation, neighbor selection, and prediction, down to the reduced
//!   aggregate with rho/MAE and the worst return code.
//! - Exercise realistic dynamical regimes (the chaotic logistic map, smooth
//!   oscillations, noisy linear response, panel data) rather than toy edge
//!   cases only.
//!
//! Coverage
//! --------
//! - `driver`: the blocking and handle-based entry points, per-theta
//!   summaries, worst-code reduction, cancellation latency, and the
//!   all-or-nothing coefficient guarantee.
//! - `manifold` + `distance`: missing-data candidate policies and the
//!   panel penalty, observed through the public engine surface.
//! - `prediction`: Simplex accuracy on chaotic data, second-nearest recall
//!   with self-match dropping, and S-map coefficient recovery on a linear
//!   generator.
//!
//! Exclusions
//! ----------
//! - Fine-grained behavior of the embedding rules, the transport solver,
//!   and the per-slot code paths — covered by unit tests in their modules.
//! - Python bindings and replay files — exercised by their own unit tests
//!   and host-level harnesses.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_edm::distance::lp_distances;
use rust_edm::prediction::nearest_neighbors;
use rust_edm::{
    Algorithm, CancelFlag, DEFAULT_MISSING, DistanceKind, EdmOptions, ManifoldGenerator,
    NeverCancel, ReturnCode, SilentIo, run, run_blocking,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MISSING: f64 = DEFAULT_MISSING;

/// Iterate the chaotic logistic map `x[n+1] = 4 x[n] (1 − x[n])` from
/// `x[0] = 0.2` and pair it with the one-step-ahead target
/// `y[n] = x[n+1]` (the final target is left missing).
fn logistic_series(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut x = Vec::with_capacity(n);
    let mut value = 0.2_f64;
    for _ in 0..n {
        x.push(value);
        value = 4.0 * value * (1.0 - value);
    }
    let mut y = x[1..].to_vec();
    y.push(MISSING);
    (x, y)
}

/// Wrap a series and its target into a generator with unit time stamps.
fn generator_for(x: Vec<f64>, y: Vec<f64>, e: usize) -> ManifoldGenerator {
    let t: Vec<f64> = (0..x.len()).map(|i| i as f64).collect();
    ManifoldGenerator::new(t, x, y, vec![], 0, e, 1, MISSING)
        .expect("generator construction should succeed for clean columns")
}

/// Filter selecting raw rows in `range` (half-open).
fn range_filter(n: usize, range: std::ops::Range<usize>) -> Vec<bool> {
    (0..n).map(|i| range.contains(&i)).collect()
}

#[test]
// Purpose
// -------
// The headline accuracy scenario: Simplex projection on the chaotic
// logistic map must recover the one-step-ahead dynamics almost perfectly
// from a modest library.
//
// Given
// -----
// - N = 200 logistic observations, E = 2, k = 3, theta = 1.
// - Training on the first 100 embeddable rows, prediction on the next 97.
//
// Expect
// ------
// - Every slot succeeds and the per-theta rho against the true targets
//   exceeds 0.95.
fn simplex_on_the_logistic_map_recovers_the_dynamics() {
    let n = 200;
    let (x, y) = logistic_series(n);
    let generator = generator_for(x, y, 2);

    // Rows 0 (incomplete embedding) and 199 (missing target) are out of range.
    let training = range_filter(n, 1..101);
    let prediction = range_filter(n, 101..198);

    let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
    opts.k = 3;

    let pred =
        run_blocking(&opts, &generator, &training, &prediction, &SilentIo, &NeverCancel).unwrap();
    assert_eq!(pred.worst_rc, ReturnCode::Success);
    assert_eq!(pred.num_predictions, 97);

    let rho = pred.rho.expect("stats were requested")[0];
    assert!(rho > 0.95, "rho = {rho}");
}

#[test]
// Purpose
// -------
// Perfect-recall setup: with the library equal to the query set and k = 1,
// the engine drops each query's zero-distance self match, so every
// prediction comes from the second-nearest point — which for a smooth
// series is still almost exact.
//
// Given
// -----
// - A smooth oscillation x[i] = sin(0.37 i) with one-step-ahead targets,
//   library = query = all embeddable rows, k = 1, Simplex.
//
// Expect
// ------
// - Every slot succeeds and rho exceeds 0.99.
fn perfect_recall_uses_the_second_nearest_neighbor() {
    let n = 200;
    let x: Vec<f64> = (0..n).map(|i| (0.37 * i as f64).sin()).collect();
    let mut y = x[1..].to_vec();
    y.push(MISSING);
    let generator = generator_for(x, y, 2);

    let filter = range_filter(n, 1..199);
    let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
    opts.k = 1;

    let pred =
        run_blocking(&opts, &generator, &filter, &filter, &SilentIo, &NeverCancel).unwrap();
    assert_eq!(pred.worst_rc, ReturnCode::Success);

    let rho = pred.rho.expect("stats were requested")[0];
    assert!(rho > 0.99, "rho = {rho}");
}

#[test]
// Purpose
// -------
// The missing-data candidate policy, observed through the public distance
// surface: a library row with a sentinel in its first column either
// disappears from every candidate set or survives with the substitute
// contribution.
//
// Given
// -----
// - A logistic library where raw cell x[50] is the sentinel, poisoning
//   column 0 of the embedded row at raw index 50.
//
// Expect
// ------
// - missing_distance = 0: no query's surviving candidates include that row.
// - missing_distance = 1: the row survives with the +1 column contribution
//   folded into its distance.
fn missing_data_policy_governs_candidate_survival() {
    let n = 120;
    let (mut x, y) = logistic_series(n);
    x[50] = MISSING;
    let generator = generator_for(x, y, 2);

    let filter = range_filter(n, 1..119);
    let library = generator.create_manifold(&filter, false).unwrap();
    let queries = generator.create_manifold(&filter, true).unwrap();
    let poisoned: usize =
        (0..library.nobs()).find(|&i| library.raw_index(i) == 50).unwrap();
    let candidates: Vec<usize> = (0..library.nobs()).collect();

    let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
    for query in [10, 40, 80] {
        let out = lp_distances(query, &opts, &library, &queries, &candidates);
        assert!(!out.indices.contains(&poisoned), "query {query} kept the poisoned row");
    }

    opts.missing_distance = 1.0;
    let query = 80;
    let out = lp_distances(query, &opts, &library, &queries, &candidates);
    let position = out
        .indices
        .iter()
        .position(|&i| i == poisoned)
        .expect("substitute policy keeps the poisoned row");
    let b = queries.get(query, 1);
    let a = library.get(poisoned, 1);
    let expected = (1.0 + (a - b) * (a - b)).sqrt();
    assert!((out.distances[position] - expected).abs() < 1e-12);
}

#[test]
// Purpose
// -------
// S-map coefficient sanity on a noisy linear generator: with uniform
// weights (theta = 0) the local regression collapses to ordinary least
// squares and must recover the generating coefficients.
//
// Given
// -----
// - x[i] iid uniform, y[n] = 2·x[n] − x[n−1] + 0.1·ε, E = 2, k = −1 (all
//   neighbors), theta = 0, coefficients saved.
//
// Expect
// ------
// - Every saved row has beta ≈ [0, 2, −1] within 0.05 and rho > 0.98.
fn smap_recovers_linear_generator_coefficients() {
    let n = 200;
    let mut rng = StdRng::seed_from_u64(42);
    let x: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let mut y = vec![MISSING; n];
    for i in 1..n {
        let noise = rng.gen::<f64>() - 0.5;
        y[i] = 2.0 * x[i] - x[i - 1] + 0.1 * noise;
    }
    let generator = generator_for(x, y, 2);

    let training = range_filter(n, 1..120);
    let prediction = range_filter(n, 120..n);

    let mut opts = EdmOptions::new(Algorithm::SMap, vec![0.0]).unwrap();
    opts.k = -1;
    opts.save_coefficients = true;

    let pred =
        run_blocking(&opts, &generator, &training, &prediction, &SilentIo, &NeverCancel).unwrap();
    assert_eq!(pred.worst_rc, ReturnCode::Success);

    let rho = pred.rho.expect("stats were requested")[0];
    assert!(rho > 0.98, "rho = {rho}");

    let cube = pred.coefficients.expect("coefficients were requested");
    for q in 0..pred.num_predictions {
        let beta: Vec<f64> = (0..3).map(|c| cube[[0, q, c]]).collect();
        assert!(beta[0].abs() < 0.05, "intercept = {}", beta[0]);
        assert!((beta[1] - 2.0).abs() < 0.05, "lag-0 coefficient = {}", beta[1]);
        assert!((beta[2] + 1.0).abs() < 0.05, "lag-1 coefficient = {}", beta[2]);
    }
}

#[test]
// Purpose
// -------
// The panel penalty keeps neighbors inside the query's panel: with two
// panels of identical dynamics and idw = 10, every cross-panel distance
// carries the penalty floor, so the nearest |panel A| candidates are all
// from panel A.
//
// Given
// -----
// - The same 60-observation logistic trace duplicated as panels 0 and 1.
// - A query from panel 0 and k = number of surviving panel-0 candidates.
//
// Expect
// ------
// - The selected neighbors are exclusively panel-0 rows, and even the
//   cross-panel copy of the query itself survives at the penalty floor
//   rather than being dropped as a self match.
fn panel_penalty_exhausts_the_home_panel_first() {
    let half = 60;
    let (trace, trace_y) = logistic_series(half);
    let mut x = trace.clone();
    x.extend_from_slice(&trace);
    let mut y = trace_y.clone();
    y.extend_from_slice(&trace_y);
    let t: Vec<f64> = (0..2 * half).map(|i| i as f64).collect();
    let panels: Vec<i32> = (0..2 * half).map(|i| i32::from(i >= half)).collect();

    let mut generator = ManifoldGenerator::new(t, x, y, vec![], 0, 2, 1, MISSING).unwrap();
    generator.add_panel_ids(panels).unwrap();

    let filter: Vec<bool> = (0..2 * half).map(|i| i % half != 0 && i % half != half - 1).collect();
    let library = generator.create_manifold(&filter, false).unwrap();
    let queries = generator.create_manifold(&filter, true).unwrap();
    let candidates: Vec<usize> = (0..library.nobs()).collect();

    let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
    opts.panel_mode = true;
    opts.idw = 10.0;

    let query = 10;
    assert_eq!(queries.panel(query), 0);
    let out = lp_distances(query, &opts, &library, &queries, &candidates);

    let home_survivors =
        out.indices.iter().filter(|&&i| library.panel(i) == 0).count();
    let order = nearest_neighbors(&out, home_survivors);
    for &pos in &order {
        assert_eq!(library.panel(out.indices[pos]), 0, "cross-panel neighbor selected early");
    }

    // The duplicated trace puts an identical point in panel 1; the penalty
    // keeps its distance strictly positive, so it survives rather than
    // being dropped as a self match.
    assert!(out.indices.iter().any(|&i| library.panel(i) == 1));
}

#[test]
// Purpose
// -------
// Cancellation latency and the all-or-nothing coefficient guarantee on a
// large run: after the probe fires, the future must resolve promptly with
// the cancelled marker as the worst code, and every coefficient row must
// be either fully written or untouched.
//
// Given
// -----
// - N = 50_000 observations of a smooth quasi-periodic signal, S-map with
//   saved coefficients, library = query = all embeddable rows, probe fired
//   5 ms after launch.
//
// Expect
// ------
// - The handle resolves well within the test timeout, worst_rc is
//   Cancelled, cancelled slots have zeroed outputs, and successful slots
//   have fully populated coefficient rows.
fn cancellation_resolves_promptly_with_whole_coefficient_rows() {
    let n = 50_000;
    let x: Vec<f64> =
        (0..n).map(|i| (0.11 * i as f64).sin() + 0.5 * (0.293 * i as f64).sin()).collect();
    let mut y = x[1..].to_vec();
    y.push(MISSING);
    let generator = generator_for(x, y, 2);
    let filter = range_filter(n, 1..n - 1);

    let mut opts = EdmOptions::new(Algorithm::SMap, vec![1.0]).unwrap();
    opts.save_coefficients = true;
    opts.report_stats = false;

    let flag = CancelFlag::new();
    let probe = flag.clone();
    let started = Instant::now();
    let handle = run(
        opts,
        generator,
        filter.clone(),
        filter,
        Arc::new(SilentIo),
        Arc::new(probe),
    );

    std::thread::sleep(Duration::from_millis(5));
    flag.cancel();
    let pred = handle.wait().unwrap();
    let elapsed = started.elapsed();

    assert_eq!(pred.worst_rc, ReturnCode::Cancelled);
    assert!(elapsed < Duration::from_secs(30), "resolution took {elapsed:?}");

    let cube = pred.coefficients.expect("coefficients were requested");
    for q in 0..pred.num_predictions {
        let row: Vec<f64> = (0..pred.num_coeff_cols).map(|c| cube[[0, q, c]]).collect();
        match pred.rc[[0, q]] {
            ReturnCode::Cancelled => {
                assert!(row.iter().all(|&v| v == 0.0), "cancelled slot {q} was written");
            }
            ReturnCode::Success => {
                assert!(row.iter().any(|&v| v != 0.0), "successful slot {q} left unwritten");
            }
            other => panic!("unexpected slot code {other:?}"),
        }
    }
}

#[test]
// Purpose
// -------
// The Wasserstein path end-to-end: curve matching over lagged blocks must
// produce a clean run with usable summaries on chaotic data.
//
// Given
// -----
// - The logistic map with E = 3, Wasserstein distance, k = 4.
//
// Expect
// ------
// - Every slot succeeds and the rho summary is a real number (not the
//   sentinel).
fn wasserstein_pipeline_completes_cleanly() {
    let n = 150;
    let (x, y) = logistic_series(n);
    let generator = generator_for(x, y, 3);

    let training = range_filter(n, 2..80);
    let prediction = range_filter(n, 80..149);

    let mut opts = EdmOptions::new(Algorithm::Simplex, vec![1.0]).unwrap();
    opts.distance = DistanceKind::Wasserstein;
    opts.k = 4;

    let pred =
        run_blocking(&opts, &generator, &training, &prediction, &SilentIo, &NeverCancel).unwrap();
    assert_eq!(pred.worst_rc, ReturnCode::Success);

    let rho = pred.rho.expect("stats were requested")[0];
    assert!(rho != MISSING && rho.is_finite(), "rho = {rho}");
}
