//! filters — train/predict row-filter construction.
//!
//! Purpose
//! -------
//! Build the boolean row filters the driver consumes, the way the host's
//! explore and cross-mapping commands build them: from the set of usable
//! rows plus one uniform draw per usable row. The core itself never draws
//! random numbers — callers seed and own the generator, so a host that
//! marshals its own RNG state reproduces the same splits.
//!
//! Key behaviors
//! -------------
//! - [`full_split`]: train and predict on every usable row.
//! - [`median_split`]: rows with a draw below the median train, the rest
//!   predict (the default explore split).
//! - [`crossfold_split`]: rows whose draw-rank falls in fold `t` predict,
//!   the rest train.
//! - [`library_split`]: predict on every usable row, train on the rows
//!   whose draw falls below the library-size cutoff (cross-mapping with a
//!   capped library).
//!
//! Conventions
//! -----------
//! - Draws are made in raw row order, one per usable row, so a fixed seed
//!   fixes the split exactly.
//! - Ranks are 1-based, matching the host convention the fold arithmetic
//!   came from.
use rand::Rng;

/// A pair of row filters ready for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainPredictSplit {
    /// Rows that become library points.
    pub training: Vec<bool>,
    /// Rows that become query points.
    pub prediction: Vec<bool>,
}

/// Train and predict on every usable row.
pub fn full_split(usable: &[bool]) -> TrainPredictSplit {
    TrainPredictSplit { training: usable.to_vec(), prediction: usable.to_vec() }
}

/// Split usable rows at the median of one uniform draw per row: below the
/// median trains, the rest predicts.
pub fn median_split<R: Rng>(usable: &[bool], rng: &mut R) -> TrainPredictSplit {
    let u = draw_uniforms(usable, rng);
    let cutoff = median(&u);

    let mut split = empty_split(usable.len());
    let mut obs = 0;
    for (i, &keep) in usable.iter().enumerate() {
        if keep {
            if u[obs] < cutoff {
                split.training[i] = true;
            } else {
                split.prediction[i] = true;
            }
            obs += 1;
        }
    }
    split
}

/// Assign usable rows to folds by the rank of their draw; fold `t` (1-based,
/// `t <= crossfold`) predicts and every other fold trains.
pub fn crossfold_split<R: Rng>(
    usable: &[bool], crossfold: usize, t: usize, rng: &mut R,
) -> TrainPredictSplit {
    let u = draw_uniforms(usable, rng);
    let ranks = rank(&u);

    let mut split = empty_split(usable.len());
    let mut obs = 0;
    for (i, &keep) in usable.iter().enumerate() {
        if keep {
            if ranks[obs] % crossfold == t - 1 {
                split.prediction[i] = true;
            } else {
                split.training[i] = true;
            }
            obs += 1;
        }
    }
    split
}

/// Predict on every usable row; train on the rows whose draw falls below
/// the cutoff that admits `library_size` rows. A library size at or above
/// the usable count trains on everything.
pub fn library_split<R: Rng>(
    usable: &[bool], library_size: usize, rng: &mut R,
) -> TrainPredictSplit {
    let u = draw_uniforms(usable, rng);
    let cutoff = if library_size < u.len() {
        let mut sorted = u.clone();
        let (_, nth, _) = sorted.select_nth_unstable_by(library_size, f64::total_cmp);
        *nth
    } else {
        f64::INFINITY
    };

    let mut split = empty_split(usable.len());
    let mut obs = 0;
    for (i, &keep) in usable.iter().enumerate() {
        if keep {
            split.prediction[i] = true;
            if u[obs] < cutoff {
                split.training[i] = true;
            }
            obs += 1;
        }
    }
    split
}

/// 1-based ranks of the values (rank 1 = smallest).
pub fn rank(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0usize; values.len()];
    for (position, &index) in order.iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// Median by selection; the mean of the two middle elements for even
/// lengths.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    let n = sorted.len();
    if n % 2 == 0 {
        let (_, upper, _) = sorted.select_nth_unstable_by(n / 2, f64::total_cmp);
        let upper = *upper;
        let (_, lower, _) = sorted.select_nth_unstable_by(n / 2 - 1, f64::total_cmp);
        (upper + *lower) / 2.0
    } else {
        let (_, mid, _) = sorted.select_nth_unstable_by(n / 2, f64::total_cmp);
        *mid
    }
}

fn draw_uniforms<R: Rng>(usable: &[bool], rng: &mut R) -> Vec<f64> {
    usable.iter().filter(|&&keep| keep).map(|_| rng.gen::<f64>()).collect()
}

fn empty_split(n: usize) -> TrainPredictSplit {
    TrainPredictSplit { training: vec![false; n], prediction: vec![false; n] }
}
