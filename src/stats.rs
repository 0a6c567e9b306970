//! NaN-aware numeric helpers shared by the QC modules.
//!
//! Seismic power matrices routinely carry NaN markers for dead channels or
//! masked bins, so every statistic here skips non-finite samples instead of
//! letting them poison the aggregate.

use ndarray::{Array2, ArrayView1};

/// Mean of the finite values in a view, ignoring NaN/inf.
///
/// Returns NaN when no finite value is present, so callers can treat an
/// empty or fully-masked selection the same way as a dead channel.
pub(crate) fn nan_mean(values: ArrayView1<'_, f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values.iter() {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation (ddof = 0) of the finite values in a view.
///
/// Returns NaN when no finite value is present.
pub(crate) fn nan_std(values: ArrayView1<'_, f64>) -> f64 {
    let mean = nan_mean(values);
    if !mean.is_finite() {
        return f64::NAN;
    }
    let mut sq_sum = 0.0;
    let mut count = 0usize;
    for &v in values.iter() {
        if v.is_finite() {
            let d = v - mean;
            sq_sum += d * d;
            count += 1;
        }
    }
    (sq_sum / count as f64).sqrt()
}

/// Index of the axis value closest to `target`.
///
/// Values outside the axis range clamp to the nearest end bin. When two
/// bins are equally close, the lower index wins.
pub(crate) fn nearest_bin(axis: ArrayView1<'_, f64>, target: f64) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &f) in axis.iter().enumerate() {
        let dist = (f - target).abs();
        if dist < best_dist {
            best_dist = dist;
            best_idx = i;
        }
    }
    best_idx
}

/// Element-wise conversion to decibel power scale: `10 * log10(p)`.
///
/// Zeros map to -inf and negative or NaN inputs map to NaN, which the
/// NaN-aware statistics then skip.
pub(crate) fn log_power_db(power: &Array2<f64>) -> Array2<f64> {
    power.mapv(|p| 10.0 * p.log10())
}
