//! Running merge state for one histogram across many sources.
//!
//! Two strategies share one type so a catalog can hold them uniformly:
//!
//! - [`MergeStrategy::MeanMerge`] combines per-source means weighted by their
//!   sample counts, tracking the sum of squared deviations `M2` with the
//!   parallel (Chan et al.) update
//!
//!   ```text
//!   Δ   = x − μ_A
//!   n_T = n_A + n_B
//!   μ   = μ_A + n_B · Δ / n_T
//!   M2  = M2_A + M2_B + n_A · n_B · Δ² / n_T
//!   ```
//!
//!   `n` counts underlying samples, never sources.
//! - [`MergeStrategy::Sum`] adds contents cell by cell, sums errors in
//!   quadrature and counts merged sources in `n`.
//!
//! Every cell is visited, guard cells included, for any dimensionality.

use crate::bin_array::BinArray;
use crate::error::{HistError, Result};
use crate::histogram::{ErrorConvention, Histogram};
use crate::moments::{MeanMoments, standard_error};
use crate::shape::Shape;

/// How an [`Accumulator`] folds sources together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeStrategy {
    /// Sample-count-weighted mean with variance tracking.
    MeanMerge,
    /// Plain elementwise sum.
    Sum,
}

#[derive(Debug, Clone)]
enum State {
    Mean { mean: BinArray, sum_sq_dev: BinArray },
    Sum { sum: BinArray, err_sq: BinArray },
}

/// What a successful fold did to the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folded {
    /// The source contributed to the state.
    Merged,
    /// Mean merge of a source with zero samples; the state is unchanged.
    NoSamples,
}

/// Merge state for one histogram path.
#[derive(Debug, Clone)]
pub struct Accumulator {
    template: Histogram,
    state: State,
    n: u64,
}

impl Accumulator {
    /// Create an accumulator shaped like `reference`; its contents are ignored.
    pub fn new(strategy: MergeStrategy, reference: &Histogram) -> Self {
        let template = reference.empty_like();
        let shape = template.shape().clone();
        let state = match strategy {
            MergeStrategy::MeanMerge => State::Mean {
                mean: BinArray::zeros(shape.clone()),
                sum_sq_dev: BinArray::zeros(shape),
            },
            MergeStrategy::Sum => {
                State::Sum { sum: BinArray::zeros(shape.clone()), err_sq: BinArray::zeros(shape) }
            }
        };
        Self { template, state, n: 0 }
    }

    /// Shorthand for [`MergeStrategy::MeanMerge`].
    pub fn mean_merge(reference: &Histogram) -> Self {
        Self::new(MergeStrategy::MeanMerge, reference)
    }

    /// Shorthand for [`MergeStrategy::Sum`].
    pub fn sum(reference: &Histogram) -> Self {
        Self::new(MergeStrategy::Sum, reference)
    }

    /// Strategy chosen at construction.
    pub fn strategy(&self) -> MergeStrategy {
        match self.state {
            State::Mean { .. } => MergeStrategy::MeanMerge,
            State::Sum { .. } => MergeStrategy::Sum,
        }
    }

    /// Name of the histogram being accumulated.
    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// Shape every source must match.
    pub fn shape(&self) -> &Shape {
        self.template.shape()
    }

    /// Dimensionality.
    pub fn dims(&self) -> usize {
        self.template.dims()
    }

    /// Samples merged so far (mean merge) or sources merged so far (sum).
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Running mean (mean merge) or running sum (sum).
    pub fn values(&self) -> &BinArray {
        match &self.state {
            State::Mean { mean, .. } => mean,
            State::Sum { sum, .. } => sum,
        }
    }

    /// Running sum of squared deviations; `None` for sums.
    pub fn sum_sq_dev(&self) -> Option<&BinArray> {
        match &self.state {
            State::Mean { sum_sq_dev, .. } => Some(sum_sq_dev),
            State::Sum { .. } => None,
        }
    }

    /// Per-cell population standard deviation `sqrt(M2 / n)`; `None` for sums.
    pub fn population_std_dev(&self) -> Option<BinArray> {
        let m2 = self.sum_sq_dev()?;
        let mut out = m2.clone();
        let n = self.n;
        out.map_in_place(|v| if n == 0 { 0.0 } else { (v / n as f64).max(0.0).sqrt() });
        Some(out)
    }

    /// Fold one source histogram into the running state.
    ///
    /// Mean merge takes `source.entries()` as its sample count and reads the
    /// errors as standard errors of the mean. A source with zero entries is a
    /// no-op reported as [`Folded::NoSamples`]. Fails before touching any state
    /// with `ShapeMismatch` if the binning differs and with `CountOverflow` if
    /// the running count would overflow.
    pub fn accumulate(&mut self, source: &Histogram) -> Result<Folded> {
        self.shape().ensure_same(source.shape())?;
        match self.state {
            State::Mean { .. } => {
                let moments = MeanMoments::from_histogram(source)?;
                self.accumulate_moments(&moments)
            }
            State::Sum { ref mut sum, ref mut err_sq } => {
                let n = checked_count(self.template.name(), self.n, 1)?;
                add_sum(sum, err_sq, source.contents(), Some(source.errors()))?;
                self.n = n;
                Ok(Folded::Merged)
            }
        }
    }

    /// Fold explicit per-cell moments into the running state.
    ///
    /// A sum accumulator adds the means as plain values and counts one source.
    pub fn accumulate_moments(&mut self, source: &MeanMoments) -> Result<Folded> {
        self.shape().ensure_same(source.means.shape())?;
        self.shape().ensure_same(source.sum_sq_dev.shape())?;
        let n_a = self.n;
        let n_b = match self.state {
            State::Mean { .. } => source.n,
            State::Sum { .. } => 1,
        };
        let n_t = checked_count(self.template.name(), n_a, n_b)?;
        let (mean, sum_sq_dev) = match &mut self.state {
            State::Mean { mean, sum_sq_dev } => (mean, sum_sq_dev),
            State::Sum { sum, err_sq } => {
                add_sum(sum, err_sq, &source.means, None)?;
                self.n = n_t;
                return Ok(Folded::Merged);
            }
        };
        if n_b == 0 {
            return Ok(Folded::NoSamples);
        }

        if n_a == 0 {
            mean.as_mut_slice().copy_from_slice(source.means.as_slice());
            sum_sq_dev.as_mut_slice().copy_from_slice(source.sum_sq_dev.as_slice());
        } else {
            let fa = n_a as f64;
            let fb = n_b as f64;
            let ft = n_t as f64;
            let cells = mean
                .as_mut_slice()
                .iter_mut()
                .zip(sum_sq_dev.as_mut_slice().iter_mut())
                .zip(source.means.as_slice().iter().zip(source.sum_sq_dev.as_slice()));
            for ((mu, m2), (&x, &v_b)) in cells {
                let delta = x - *mu;
                *mu += fb * (delta / ft);
                *m2 += v_b + (fa * fb) * (delta * delta / ft);
            }
        }
        self.n = n_t;
        Ok(Folded::Merged)
    }

    /// Produce the merged histogram.
    ///
    /// Mean merge emits the mean with standard errors `sqrt(M2 / (n (n − 1)))`
    /// and `entries = n`, i.e. the same convention as its inputs, so the result
    /// can be merged again. Sums emit the total with quadrature errors and
    /// `entries` = number of merged sources.
    pub fn terminate(self) -> Histogram {
        let Accumulator { template, state, n } = self;
        let (contents, errors, convention) = match state {
            State::Mean { mean, mut sum_sq_dev } => {
                sum_sq_dev.map_in_place(|m2| standard_error(m2, n));
                (mean, sum_sq_dev, ErrorConvention::StandardErrorOfMean)
            }
            State::Sum { sum, mut err_sq } => {
                err_sq.map_in_place(|v| v.max(0.0).sqrt());
                (sum, err_sq, template.convention())
            }
        };
        template.into_merged(contents, errors, n, convention)
    }
}

fn checked_count(name: &str, n: u64, added: u64) -> Result<u64> {
    n.checked_add(added)
        .ok_or_else(|| HistError::CountOverflow { name: name.to_string(), n, added })
}

fn add_sum(
    sum: &mut BinArray,
    err_sq: &mut BinArray,
    values: &BinArray,
    errors: Option<&BinArray>,
) -> Result<()> {
    sum.add_assign(values)?;
    if let Some(errors) = errors {
        err_sq.ensure_same_shape(errors)?;
        for (acc, e) in err_sq.as_mut_slice().iter_mut().zip(errors.as_slice()) {
            *acc += e * e;
        }
    }
    Ok(())
}
