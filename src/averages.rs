//! Weighted moving averages over recorded quotes
//!
//! Weights are indexed by distance from the newest sample: `x = 0` is the
//! latest value and larger `x` look further back.

/// Window used when smoothing recorded quotes
pub const NUM_WEIGHING_SAMPLES: usize = 10;

/// Linear weighing function over `n` samples: the newest weighs `n`, the
/// oldest weighs 1.
pub fn linear(n: usize) -> impl Fn(usize) -> f64 {
    move |x| n.saturating_sub(x) as f64
}

/// Equal weights, i.e. a plain mean
pub fn uniform(_x: usize) -> f64 {
    1.0
}

/// Weighted average of the last `n` values of `series`.
///
/// Uses fewer samples when the series is shorter than `n`. Returns `None` for
/// an empty series, `n == 0`, or weights that sum to zero.
pub fn weighted_average<F>(series: &[f64], n: usize, weigh: F) -> Option<f64>
where
    F: Fn(usize) -> f64,
{
    let mut sum = 0.0;
    let mut denom = 0.0;

    for (x, value) in series.iter().rev().take(n).enumerate() {
        let w = weigh(x);
        sum += value * w;
        denom += w;
    }

    if denom == 0.0 {
        None
    } else {
        Some(sum / denom)
    }
}

/// Linearly weighted moving average of the latest sample
pub fn latest_moving_average(series: &[f64], n: usize) -> Option<f64> {
    weighted_average(series, n, linear(n))
}
