//! manifold — time-delay embedding: raw columns in, embedded point blocks out.
//!
//! Purpose
//! -------
//! Provide the state-space reconstruction layer: a [`ManifoldGenerator`]
//! that owns the raw time-stamped columns and embedding parameters, and the
//! immutable [`Manifold`] blocks it materializes for specific row filters.
//! Library and query blocks of one run always come from the same generator,
//! which is what makes per-column distances well-defined across the pair.
//!
//! Key behaviors
//! -------------
//! - Deterministic embedding with explicit sentinel semantics: entries that
//!   cannot be produced (before the start of history, across a panel break,
//!   through a missing cell) carry the MISSING sentinel.
//! - Optional inter-observation-gap (`dt`) columns, lag-embedded extras,
//!   co-prediction primaries, and panel ids.
//! - A lagged-curve view over each point for the Wasserstein engine.
//!
//! Conventions
//! -----------
//! - Row-major storage, one point per row, `E_actual` columns always.
//! - All sentinel comparisons are by exact equality; the sentinel value
//!   travels with the generator and its blocks.
//!
//! Downstream usage
//! ----------------
//! - The driver asks the generator for a library block (`prediction =
//!   false`) and a query block (`prediction = true`), then shares both
//!   read-only with every worker.
//! - The distance engines consume blocks through the accessors here and
//!   never copy them.
//!
//! Testing notes
//! -------------
//! - `generator` pins the embedding rules (lags, dt layouts, panel breaks,
//!   extras, co-prediction, idempotence); `block` pins the curve view.

pub mod block;
pub mod generator;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::block::Manifold;
pub use self::generator::ManifoldGenerator;
