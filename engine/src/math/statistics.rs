use std::cmp::Ordering;

use statrs::statistics::Statistics;

/// Arithmetic mean. `NaN` for an empty sample.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Population standard deviation (denominator `N`).
pub fn population_std_dev(values: &[f64]) -> f64 {
    values.iter().population_std_dev()
}

/// Percentiles at `levels` (each in `[0, 100]`) of an unsorted sample, using
/// linear interpolation between the two closest ranks, `pos = p/100 * (n - 1)`.
/// The sample is sorted once for all levels.
pub fn percentiles(values: &[f64], levels: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    levels
        .iter()
        .map(|p| percentile_of_sorted(&sorted, *p))
        .collect()
}

fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
