//! Explicit per-cell sample moments exchanged between producers and the mean merge.
//!
//! A stored mean histogram only carries `(mean, standard error, entries)`.
//! [`MeanMoments`] makes the implied statistics explicit: per cell the mean
//! over `n` samples and the sum of squared deviations `M2`, with
//! `M2 = e² · n · (n − 1)` recovered from the standard error `e`. The
//! inverse, `e = sqrt(M2 / (n · (n − 1)))`, is applied on output.

use crate::bin_array::BinArray;
use crate::error::{HistError, Result};
use crate::histogram::{ErrorConvention, Histogram};

/// Per-cell mean and sum of squared deviations over `n` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanMoments {
    /// Per-cell means.
    pub means: BinArray,
    /// Per-cell sum of squared deviations from the mean.
    pub sum_sq_dev: BinArray,
    /// Number of samples behind every cell.
    pub n: u64,
}

impl MeanMoments {
    /// Recover moments from a mean histogram with standard errors.
    pub fn from_histogram(h: &Histogram) -> Result<Self> {
        if h.convention() != ErrorConvention::StandardErrorOfMean {
            return Err(HistError::Convention {
                name: h.name().to_string(),
                found: h.convention().label(),
            });
        }
        let n = h.entries();
        let scale = sum_sq_dev_factor(n);
        let mut sum_sq_dev = h.errors().clone();
        sum_sq_dev.map_in_place(|e| e * e * scale);
        Ok(Self { means: h.contents().clone(), sum_sq_dev, n })
    }

    /// A single sample: `values` with zero spread and `n = 1`.
    pub fn single(values: BinArray) -> Self {
        let sum_sq_dev = BinArray::zeros(values.shape().clone());
        Self { means: values, sum_sq_dev, n: 1 }
    }
}

/// `n · (n − 1)` as `f64`, the factor linking `M2` and the squared standard error.
#[inline]
pub(crate) fn sum_sq_dev_factor(n: u64) -> f64 {
    if n < 2 { 0.0 } else { n as f64 * (n - 1) as f64 }
}

/// Standard error of the mean from `M2` over `n` samples; zero below two samples.
#[inline]
pub(crate) fn standard_error(sum_sq_dev: f64, n: u64) -> f64 {
    let factor = sum_sq_dev_factor(n);
    if factor > 0.0 { (sum_sq_dev / factor).max(0.0).sqrt() } else { 0.0 }
}
