//! Statistical quality-control primitives for seismic array processing.
//!
//! This crate carries the two numerical screens a noise-processing
//! pipeline runs before aggregating array data:
//!
//! - **Channel rejection** ([`channel_rejection`]): iteratively drops
//!   channels whose power spectral density deviates from the array
//!   population within a frequency band, converging to a stable kept set
//!   with a minimum-retain floor.
//! - **Run-length spans** ([`spans`]): lengths of the maximal `true` runs
//!   in a boolean availability mask, used to decide whether a time window
//!   has sufficient continuous coverage.
//!
//! Both are pure, synchronous functions over read-only inputs: no I/O, no
//! shared state, and identical inputs always produce identical outputs.
//!
//! # Example
//!
//! ```
//! use ndarray::{Array1, Array2};
//! use seismo_qc::{reject_noisy_channels, ChannelRejectionConfig};
//!
//! // Eight consistent channels over 32 frequency bins
//! let power = Array2::from_elem((8, 32), 1.0e-12);
//! let freqs = Array1::from_iter((0..32).map(|i| i as f64 * 0.0625));
//!
//! let outcome =
//!     reject_noisy_channels(&power, &freqs, &ChannelRejectionConfig::default()).unwrap();
//! assert_eq!(outcome.good.len(), 8);
//! assert!(outcome.converged);
//! ```

#![forbid(unsafe_code)]

pub mod channel_rejection;
pub mod spans;
mod stats;

pub use channel_rejection::{
    reject_noisy_channels, ChannelRejection, ChannelRejectionConfig, ChannelRejectionError,
};
pub use spans::{count_true_runs, max_true_run, SpanError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for QC operations
pub type Result<T> = std::result::Result<T, QcError>;

/// Unified error type for QC operations
#[derive(Debug, thiserror::Error)]
pub enum QcError {
    /// Channel rejection error
    #[error("channel rejection error: {0}")]
    ChannelRejection(#[from] ChannelRejectionError),

    /// Run-length counting error
    #[error("span counting error: {0}")]
    Span(#[from] SpanError),
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channel_rejection::{
        reject_noisy_channels, ChannelRejection, ChannelRejectionConfig,
    };
    pub use crate::spans::{count_true_runs, max_true_run};
    pub use crate::{QcError, Result};
}
