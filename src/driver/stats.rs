//! Prediction-quality summaries: Pearson rho and mean absolute error.
//!
//! Both reductions run over the pairs where neither the prediction nor the
//! observed target carries the MISSING sentinel. An undefined statistic
//! (fewer than two usable pairs, or a degenerate spread) comes back as the
//! sentinel itself, matching the convention for outputs that cannot be
//! produced.
use statrs::statistics::Statistics;

/// Pearson correlation between predictions and observations over their
/// non-missing pairs; the sentinel when undefined.
pub fn pearson_rho(predicted: &[f64], observed: &[f64], missing: f64) -> f64 {
    let (a, b) = paired(predicted, observed, missing);
    if a.len() < 2 {
        return missing;
    }
    let mean_a = (&a).mean();
    let mean_b = (&b).mean();
    let sd_a = (&a).std_dev();
    let sd_b = (&b).std_dev();
    if sd_a == 0.0 || sd_b == 0.0 {
        return missing;
    }

    let n = a.len() as f64;
    let covariance: f64 = a
        .iter()
        .zip(&b)
        .map(|(&va, &vb)| (va - mean_a) * (vb - mean_b))
        .sum::<f64>()
        / (n - 1.0);
    covariance / (sd_a * sd_b)
}

/// Mean absolute error over the non-missing pairs; the sentinel when no
/// pair survives.
pub fn mean_absolute_error(predicted: &[f64], observed: &[f64], missing: f64) -> f64 {
    let (a, b) = paired(predicted, observed, missing);
    if a.is_empty() {
        return missing;
    }
    a.iter().zip(&b).map(|(&va, &vb)| (va - vb).abs()).sum::<f64>() / a.len() as f64
}

fn paired(predicted: &[f64], observed: &[f64], missing: f64) -> (Vec<f64>, Vec<f64>) {
    let mut a = Vec::with_capacity(predicted.len());
    let mut b = Vec::with_capacity(predicted.len());
    for (&p, &o) in predicted.iter().zip(observed) {
        if p != missing && o != missing {
            a.push(p);
            b.push(o);
        }
    }
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: f64 = f64::MAX;

    #[test]
    // Purpose
    // -------
    // A perfect linear relation scores rho = 1 and its MAE equals the
    // constant offset; sentinel pairs are excluded from both.
    //
    // Given
    // -----
    // - predicted = observed + 0.5 with one sentinel slot on each side.
    //
    // Expect
    // ------
    // - rho ≈ 1, mae ≈ 0.5, both unaffected by the sentinel slots.
    fn linear_relation_scores_unit_rho_and_offset_mae() {
        let predicted = vec![1.5, 2.5, MISSING, 4.5, 5.5];
        let observed = vec![1.0, 2.0, 3.0, 4.0, MISSING];

        let rho = pearson_rho(&predicted, &observed, MISSING);
        let mae = mean_absolute_error(&predicted, &observed, MISSING);
        assert!((rho - 1.0).abs() < 1e-12, "rho = {rho}");
        assert!((mae - 0.5).abs() < 1e-12, "mae = {mae}");
    }

    #[test]
    // Purpose
    // -------
    // Degenerate inputs (no usable pairs, or zero spread) must come back
    // as the sentinel, never as NaN.
    fn degenerate_inputs_return_the_sentinel() {
        let rho = pearson_rho(&[MISSING, MISSING], &[1.0, 2.0], MISSING);
        assert_eq!(rho, MISSING);

        let rho = pearson_rho(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0], MISSING);
        assert_eq!(rho, MISSING);

        let mae = mean_absolute_error(&[MISSING], &[1.0], MISSING);
        assert_eq!(mae, MISSING);
    }
}
