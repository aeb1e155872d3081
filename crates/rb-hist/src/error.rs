//! Error types for bin arrays, histograms and accumulators.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised while building or merging histograms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistError {
    /// Two bin arrays taking part in one operation disagree on dimensionality or bin counts.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Shape of the running accumulator (or left operand).
        expected: Shape,
        /// Shape of the incoming object.
        found: Shape,
    },

    /// Invalid shape description (zero axes, more than four axes, zero bins).
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Flat data length does not match the number of cells of the shape.
    #[error("data length {len} does not match {cells} cells of shape {shape}")]
    DataLength {
        /// Declared shape.
        shape: Shape,
        /// Expected number of cells.
        cells: usize,
        /// Length actually supplied.
        len: usize,
    },

    /// Invalid axis binning (unsorted or non-finite edges).
    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    /// Incoming histogram follows an error convention the merge cannot interpret.
    #[error(
        "histogram '{name}' carries {found} errors, mean merge needs standard errors of the mean"
    )]
    Convention {
        /// Histogram name.
        name: String,
        /// Convention found on the histogram.
        found: &'static str,
    },

    /// Merging would overflow the running sample or source count.
    #[error("count overflow merging '{name}': {n} + {added}")]
    CountOverflow {
        /// Histogram name.
        name: String,
        /// Running count.
        n: u64,
        /// Count being added.
        added: u64,
    },
}

/// Result alias for histogram operations.
pub type Result<T> = std::result::Result<T, HistError>;
