//! Iterative statistical rejection of noisy array channels.
//!
//! Screens the rows of a power spectral density matrix (channels ×
//! frequency bins) against the array population: per frequency bin, a
//! channel votes "bad" when its dB power deviates from the population mean
//! by more than a configurable number of standard deviations. Channels
//! accumulating too many bad votes inside the band of interest are dropped
//! and the statistics are recomputed over the survivors, until the kept set
//! stops changing. A minimum-retain floor keeps the screen from rejecting
//! the array down to nothing when the population is broadly inconsistent.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::stats::{log_power_db, nan_mean, nan_std, nearest_bin};

/// Errors that can occur during channel rejection.
#[derive(Debug, Error)]
pub enum ChannelRejectionError {
    /// Power matrix column count disagrees with the frequency axis length
    #[error("power matrix has {bins} frequency bins but the axis has {axis_len} values")]
    ShapeMismatch {
        /// Number of columns in the power matrix
        bins: usize,
        /// Number of values on the frequency axis
        axis_len: usize,
    },

    /// Invalid configuration parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for the channel rejection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRejectionConfig {
    /// Lower edge of the band of interest, in the frequency axis units (Hz)
    pub freq_low: f64,
    /// Upper edge of the band of interest (Hz)
    pub freq_high: f64,
    /// Deviation threshold in units of per-bin population σ
    pub std_threshold: f64,
    /// Maximum tolerated fraction of bad-vote bins within the band, in [0, 1]
    pub max_bad_fraction: f64,
    /// Never reject below this many channels (≥ 1)
    pub min_keep: usize,
    /// Iteration cap; `None` resolves to twice the channel count (floor 32)
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl Default for ChannelRejectionConfig {
    fn default() -> Self {
        Self {
            freq_low: 0.25,
            freq_high: 1.5,
            std_threshold: 2.5,
            max_bad_fraction: 0.5,
            min_keep: 3,
            max_iterations: None,
        }
    }
}

/// Outcome of the channel rejection screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRejection {
    /// Row indices of the channels kept by the screen, ascending.
    /// Always a subset of `on`.
    pub good: Vec<usize>,
    /// Row indices of the channels that carried data at all (finite row
    /// mean), ascending
    pub on: Vec<usize>,
    /// Number of classification passes performed
    pub iterations: usize,
    /// Whether the kept set reached a fixed point. `false` means the
    /// iteration cap was hit and `good` holds the last committed set.
    pub converged: bool,
}

/// Tracks the evolving kept set across classification passes.
///
/// Convergence is membership equality between `active` and `previous`;
/// both stay sorted ascending so plain `Vec` equality is sufficient.
struct IterationState {
    active: Vec<usize>,
    previous: Option<Vec<usize>>,
}

/// Reject channels whose power spectra deviate from the array population.
///
/// `power`: (channels × frequency-bins) non-negative power estimates. Rows
/// filled with NaN mark channels with no data; they are reported in neither
/// the kept set nor the statistics, only excluded up front.
/// `freqs`: frequency value of each column, same length as the matrix is
/// wide.
///
/// Band edges outside the axis range clamp to the nearest available bin;
/// when two bins are equally close, the lower index wins. Per-bin mean and
/// σ sweep the columns below the upper band edge, while bad votes are
/// tallied inside `[freq_low, freq_high)` only. A deviation exactly equal
/// to `std_threshold × σ` does not vote.
///
/// Returns the kept and initially-on channel index sets. Failure to reach
/// a fixed point within the iteration cap is not an error: the outcome
/// carries the last committed set with `converged: false`.
pub fn reject_noisy_channels(
    power: &Array2<f64>,
    freqs: &Array1<f64>,
    config: &ChannelRejectionConfig,
) -> Result<ChannelRejection, ChannelRejectionError> {
    let (n_channels, n_bins) = power.dim();

    if n_bins != freqs.len() {
        return Err(ChannelRejectionError::ShapeMismatch {
            bins: n_bins,
            axis_len: freqs.len(),
        });
    }
    if config.min_keep < 1 {
        return Err(ChannelRejectionError::InvalidConfig(
            "min_keep must be at least 1".into(),
        ));
    }
    if !config.std_threshold.is_finite() || config.std_threshold < 0.0 {
        return Err(ChannelRejectionError::InvalidConfig(format!(
            "std_threshold must be finite and non-negative, got {}",
            config.std_threshold
        )));
    }
    if !(0.0..=1.0).contains(&config.max_bad_fraction) {
        return Err(ChannelRejectionError::InvalidConfig(format!(
            "max_bad_fraction must be within [0, 1], got {}",
            config.max_bad_fraction
        )));
    }

    let c_high = nearest_bin(freqs.view(), config.freq_high);
    let c_low = nearest_bin(freqs.view(), config.freq_low);
    let band_width = c_high.saturating_sub(c_low);
    let vote_limit = config.max_bad_fraction * band_width as f64;

    // Channels whose raw row mean is non-finite carry no usable data and
    // stay out of every later pass.
    let on: Vec<usize> = (0..n_channels)
        .filter(|&ch| {
            power
                .row(ch)
                .mean()
                .map(f64::is_finite)
                .unwrap_or(false)
        })
        .collect();

    // Population statistics run on the dB power scale.
    let log_power = log_power_db(power);

    let max_iterations = config
        .max_iterations
        .unwrap_or_else(|| (2 * n_channels).max(32));

    let mut state = IterationState {
        active: on.clone(),
        previous: None,
    };
    let mut iterations = 0usize;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        let candidates = classification_pass(
            &log_power,
            &state.active,
            c_low,
            c_high,
            config.std_threshold,
            vote_limit,
        );

        state.previous = Some(state.active.clone());
        // Commit only while the floor holds; otherwise the set stays as-is
        // and the equality check below ends the loop.
        if candidates.len() > config.min_keep {
            state.active = candidates;
        }

        debug!(
            iteration = iterations,
            active = state.active.len(),
            "channel rejection pass"
        );

        if state.previous.as_ref() == Some(&state.active) {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            iterations,
            active = state.active.len(),
            "channel rejection hit the iteration cap before converging"
        );
    }

    Ok(ChannelRejection {
        good: state.active,
        on,
        iterations,
        converged,
    })
}

/// One classification pass: per-bin population statistics over the active
/// rows, then the subset of active channels whose band vote count stays
/// within the limit, in the same (ascending) order.
fn classification_pass(
    log_power: &Array2<f64>,
    active: &[usize],
    c_low: usize,
    c_high: usize,
    std_threshold: f64,
    vote_limit: f64,
) -> Vec<usize> {
    // Project once onto the active rows so each per-bin sweep is a plain
    // column walk.
    let projection = log_power.select(Axis(0), active);

    let mut bin_mean = vec![f64::NAN; c_high];
    let mut bin_std = vec![f64::NAN; c_high];
    for f in 0..c_high {
        let column = projection.column(f);
        bin_mean[f] = nan_mean(column);
        bin_std[f] = nan_std(column);
    }

    let mut candidates = Vec::with_capacity(active.len());
    for (i, &ch) in active.iter().enumerate() {
        let mut votes = 0usize;
        for f in c_low..c_high {
            let value = projection[[i, f]];
            // Non-finite samples and degenerate bins never vote; a
            // deviation exactly at the threshold keeps the channel.
            if value.is_finite()
                && bin_std[f].is_finite()
                && (value - bin_mean[f]).abs() > std_threshold * bin_std[f]
            {
                votes += 1;
            }
        }
        if (votes as f64) <= vote_limit {
            candidates.push(ch);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    /// Axis of `n` bins spaced `df` apart starting at 0.
    fn axis(n: usize, df: f64) -> Array1<f64> {
        Array1::from_iter((0..n).map(|i| i as f64 * df))
    }

    /// Uniform matrix with one row scaled by `factor`.
    fn matrix_with_outlier(channels: usize, bins: usize, outlier: usize, factor: f64) -> Array2<f64> {
        let mut m = Array2::from_elem((channels, bins), 1.0);
        for f in 0..bins {
            m[[outlier, f]] *= factor;
        }
        m
    }

    #[test]
    fn shape_mismatch_is_fatal() {
        let power = Array2::from_elem((4, 10), 1.0);
        let freqs = axis(9, 0.2);
        let err = reject_noisy_channels(&power, &freqs, &ChannelRejectionConfig::default());
        assert!(matches!(
            err,
            Err(ChannelRejectionError::ShapeMismatch { bins: 10, axis_len: 9 })
        ));
    }

    #[test]
    fn zero_min_keep_is_rejected() {
        let power = Array2::from_elem((4, 10), 1.0);
        let freqs = axis(10, 0.2);
        let config = ChannelRejectionConfig {
            min_keep: 0,
            ..Default::default()
        };
        assert!(matches!(
            reject_noisy_channels(&power, &freqs, &config),
            Err(ChannelRejectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn negative_std_threshold_is_rejected() {
        let power = Array2::from_elem((4, 10), 1.0);
        let freqs = axis(10, 0.2);
        let config = ChannelRejectionConfig {
            std_threshold: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            reject_noisy_channels(&power, &freqs, &config),
            Err(ChannelRejectionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn consistent_array_keeps_every_channel() {
        let power = Array2::from_elem((8, 20), 2.0);
        let freqs = axis(20, 0.1);
        let result =
            reject_noisy_channels(&power, &freqs, &ChannelRejectionConfig::default()).unwrap();
        assert_eq!(result.good, (0..8).collect::<Vec<_>>());
        assert_eq!(result.on, (0..8).collect::<Vec<_>>());
        assert!(result.converged);
    }

    #[test]
    fn loud_channel_is_rejected() {
        // Channel 3 sits 30 dB above an otherwise uniform array
        let power = matrix_with_outlier(10, 20, 3, 1000.0);
        let freqs = axis(20, 0.1);
        let result =
            reject_noisy_channels(&power, &freqs, &ChannelRejectionConfig::default()).unwrap();
        assert!(!result.good.contains(&3));
        assert_eq!(result.good.len(), 9);
        assert!(result.converged);
    }

    #[test]
    fn nan_row_is_off_not_rejected() {
        let mut power = Array2::from_elem((6, 20), 1.0);
        for f in 0..20 {
            power[[2, f]] = f64::NAN;
        }
        let freqs = axis(20, 0.1);
        let result =
            reject_noisy_channels(&power, &freqs, &ChannelRejectionConfig::default()).unwrap();
        assert_eq!(result.on, vec![0, 1, 3, 4, 5]);
        assert_eq!(result.good, vec![0, 1, 3, 4, 5]);
    }

    #[test]
    fn floor_blocks_mass_rejection() {
        // Four wildly inconsistent channels; with min_keep = 3 the screen
        // may not drop below three, so it must leave the set unchanged.
        let mut power = Array2::from_elem((4, 20), 1.0);
        for (ch, factor) in [(0, 1.0), (1, 1e4), (2, 1e-4), (3, 1e8)] {
            for f in 0..20 {
                power[[ch, f]] *= factor;
            }
        }
        let freqs = axis(20, 0.1);
        let config = ChannelRejectionConfig {
            min_keep: 3,
            ..Default::default()
        };
        let result = reject_noisy_channels(&power, &freqs, &config).unwrap();
        assert!(result.good.len() >= 3);
        assert!(result.converged);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        // Two staged outliers force at least two shrinking passes, so a cap
        // of one pass cannot reach a fixed point.
        let mut power = matrix_with_outlier(12, 20, 0, 1e6);
        for f in 0..20 {
            power[[1, f]] = 1.5;
        }
        let freqs = axis(20, 0.1);
        let config = ChannelRejectionConfig {
            max_iterations: Some(1),
            ..Default::default()
        };
        let result = reject_noisy_channels(&power, &freqs, &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        // The pass that did run still committed its rejection
        assert!(!result.good.contains(&0));
    }

    #[test]
    fn band_edges_clamp_to_axis_range() {
        // Thresholds far outside the axis degrade to the end bins instead
        // of erroring.
        let power = matrix_with_outlier(10, 20, 5, 1000.0);
        let freqs = axis(20, 0.1);
        let config = ChannelRejectionConfig {
            freq_low: -10.0,
            freq_high: 500.0,
            ..Default::default()
        };
        let result = reject_noisy_channels(&power, &freqs, &config).unwrap();
        assert!(!result.good.contains(&5));
    }

    #[test]
    fn inverted_band_rejects_nothing() {
        let power = matrix_with_outlier(10, 20, 5, 1000.0);
        let freqs = axis(20, 0.1);
        let config = ChannelRejectionConfig {
            freq_low: 1.5,
            freq_high: 0.25,
            ..Default::default()
        };
        let result = reject_noisy_channels(&power, &freqs, &config).unwrap();
        assert_eq!(result.good, result.on);
        assert!(result.converged);
    }
}
