//! Per-file reduction of per-entry (per-event) histogram fills into a mean histogram.
//!
//! Each entry contributes one sample per cell; the result carries the mean
//! over all entries and the standard error of that mean, which is exactly the
//! form the cross-file mean merge expects as input.

use crate::accumulator::Accumulator;
use crate::bin_array::BinArray;
use crate::error::Result;
use crate::histogram::Histogram;
use crate::moments::MeanMoments;

/// Running per-entry mean for one histogram within a single file.
#[derive(Debug, Clone)]
pub struct PerEntryReducer {
    inner: Accumulator,
    zero: MeanMoments,
}

impl PerEntryReducer {
    /// Reducer shaped like `reference` (its contents are ignored).
    pub fn new(reference: &Histogram) -> Self {
        let zero = MeanMoments::single(BinArray::zeros(reference.shape().clone()));
        Self { inner: Accumulator::mean_merge(reference), zero }
    }

    /// Add one entry's filled values.
    pub fn accumulate_entry(&mut self, values: &BinArray) -> Result<()> {
        self.inner.shape().ensure_same(values.shape())?;
        self.inner.accumulate_moments(&MeanMoments::single(values.clone())).map(|_| ())
    }

    /// Add an entry that filled nothing; it still counts as a sample of zeros.
    pub fn accumulate_empty_entry(&mut self) -> Result<()> {
        self.inner.accumulate_moments(&self.zero).map(|_| ())
    }

    /// Entries reduced so far.
    pub fn n_entries(&self) -> u64 {
        self.inner.n()
    }

    /// Running per-cell mean.
    pub fn mean(&self) -> &BinArray {
        self.inner.values()
    }

    /// Mean histogram with standard errors and `entries` = number of entries.
    pub fn terminate(self) -> Histogram {
        self.inner.terminate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HistError;
    use crate::histogram::{Axis, ErrorConvention};
    use crate::shape::Shape;
    use approx::assert_relative_eq;

    fn template() -> Histogram {
        Histogram::new("eloss", "Energy loss", vec![Axis::uniform(2, 0.0, 10.0).unwrap()]).unwrap()
    }

    fn entry(values: [f64; 4]) -> BinArray {
        BinArray::from_vec(Shape::new(&[2]).unwrap(), values.to_vec()).unwrap()
    }

    #[test]
    fn reduces_entries_to_mean_and_standard_error() {
        let mut r = PerEntryReducer::new(&template());
        for x in [1.0, 2.0, 3.0, 6.0] {
            r.accumulate_entry(&entry([0.0, x, 2.0 * x, 0.0])).unwrap();
        }
        assert_eq!(r.n_entries(), 4);
        let h = r.terminate();
        assert_eq!(h.entries(), 4);
        assert_eq!(h.convention(), ErrorConvention::StandardErrorOfMean);
        assert_relative_eq!(h.content(&[0]).unwrap(), 3.0);
        // M2 = 4 + 1 + 0 + 9 = 14; se = sqrt(14 / 12)
        assert_relative_eq!(h.error(&[0]).unwrap(), (14.0f64 / 12.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(h.content(&[1]).unwrap(), 6.0);
        assert_eq!(h.content(&[-1]), Some(0.0));
    }

    #[test]
    fn empty_entries_pull_the_mean_down() {
        let mut r = PerEntryReducer::new(&template());
        r.accumulate_entry(&entry([0.0, 4.0, 0.0, 0.0])).unwrap();
        r.accumulate_empty_entry().unwrap();
        assert_eq!(r.n_entries(), 2);
        assert_relative_eq!(r.mean().get(&[0]).unwrap(), 2.0);
    }

    #[test]
    fn reduced_files_merge_like_one_big_file() {
        let samples: Vec<f64> = (0..30).map(|i| (i as f64 * 0.37).sin() * 5.0 + 1.0).collect();

        let mut whole = PerEntryReducer::new(&template());
        for &x in &samples {
            whole.accumulate_entry(&entry([0.0, x, 0.0, 0.0])).unwrap();
        }
        let whole = whole.terminate();

        let mut merged = Accumulator::mean_merge(&template());
        for chunk in samples.chunks(7) {
            let mut part = PerEntryReducer::new(&template());
            for &x in chunk {
                part.accumulate_entry(&entry([0.0, x, 0.0, 0.0])).unwrap();
            }
            merged.accumulate(&part.terminate()).unwrap();
        }
        let merged = merged.terminate();

        assert_eq!(merged.entries(), whole.entries());
        assert_relative_eq!(
            merged.content(&[0]).unwrap(),
            whole.content(&[0]).unwrap(),
            max_relative = 1e-10
        );
        assert_relative_eq!(
            merged.error(&[0]).unwrap(),
            whole.error(&[0]).unwrap(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn rejects_wrongly_shaped_entries() {
        let mut r = PerEntryReducer::new(&template());
        let bad = BinArray::zeros(Shape::new(&[3]).unwrap());
        assert!(matches!(r.accumulate_entry(&bad), Err(HistError::ShapeMismatch { .. })));
        assert_eq!(r.n_entries(), 0);
    }
}
