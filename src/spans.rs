//! Run-length analysis of boolean availability masks.
//!
//! Continuity checks on merged seismic traces produce a mask marking which
//! samples are gaps; the QC stage then asks how long the continuous spans
//! are. These helpers count maximal runs of `true` without allocating
//! anything beyond the output.

use thiserror::Error;

/// Errors from run-length counting.
#[derive(Debug, Error)]
pub enum SpanError {
    /// The mask has no elements
    #[error("mask must contain at least one element")]
    EmptyMask,
}

/// Lengths of every maximal run of `true`, left to right.
///
/// Runs of `false` are not reported, so an all-`false` mask yields an
/// empty vector. Runs touching either end of the mask count in full.
///
/// ```
/// use seismo_qc::spans::count_true_runs;
///
/// let mask = [false, true, false, false, true, true, true];
/// assert_eq!(count_true_runs(&mask).unwrap(), vec![1, 3]);
/// ```
pub fn count_true_runs(mask: &[bool]) -> Result<Vec<usize>, SpanError> {
    if mask.is_empty() {
        return Err(SpanError::EmptyMask);
    }

    // Walk the transition points, with implicit boundaries before the
    // first element and after the last; the gap between consecutive
    // transitions is one run.
    let mut runs = Vec::new();
    let mut run_start = 0usize;
    for i in 1..mask.len() {
        if mask[i] != mask[i - 1] {
            if mask[i - 1] {
                runs.push(i - run_start);
            }
            run_start = i;
        }
    }
    if mask[mask.len() - 1] {
        runs.push(mask.len() - run_start);
    }
    Ok(runs)
}

/// Length of the longest run of `true`, or 0 when the mask has none.
///
/// Continuity QC only ever asks whether any gap exceeds a limit, which
/// this answers in one call.
pub fn max_true_run(mask: &[bool]) -> Result<usize, SpanError> {
    Ok(count_true_runs(mask)?.into_iter().max().unwrap_or(0))
}
