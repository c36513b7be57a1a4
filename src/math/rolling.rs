//! Trailing-window statistics and ranking over ordered series.
//!
//! Windows always end at the current observation and shrink at the start of a
//! series, so every statistic is defined from the first observation onward.

use std::cmp::Ordering;

/// Trailing mean over at most `window` observations.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| mean(&values[trailing(i, window)..=i]))
        .collect()
}

/// Trailing sample standard deviation (ddof = 1) over at most `window`
/// observations. A window holding a single observation has deviation 0.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| sample_std(&values[trailing(i, window)..=i]))
        .collect()
}

/// 1-based ordinal rank, ascending. Ties keep their input order.
pub fn ordinal_rank(values: &[f64]) -> Vec<i64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // sort_by is stable, which is what breaks ties by position
    order.sort_by(|&a, &b| cmp_f64(values[a], values[b]));

    let mut ranks = vec![0_i64; values.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank as i64 + 1;
    }
    ranks
}

/// Relative change against the previous observation.
///
/// The first observation, and any observation whose predecessor is zero, has
/// no defined change.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        out.push(if i == 0 { None } else { relative_change(values[i - 1], values[i]) });
    }
    out
}

/// `(current - previous) / previous`, undefined when `previous` is zero.
pub fn relative_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous)
    }
}

/// Value `periods` observations back, if the series is long enough.
pub fn lag<T: Copy>(values: &[T], periods: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| i.checked_sub(periods).map(|j| values[j]))
        .collect()
}

fn trailing(i: usize, window: usize) -> usize {
    (i + 1).saturating_sub(window)
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (xs.len() - 1) as f64).sqrt()
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}
