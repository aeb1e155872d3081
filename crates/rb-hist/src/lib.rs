//! # rb-hist
//!
//! Guarded 1–4 dimensional bin arrays, histograms and the statistics used to
//! merge them: a per-entry reducer that turns per-event fills into a mean
//! histogram for one file, and accumulators that combine such per-file
//! results (or plain sums) across any number of files.
//!
//! ## Example
//!
//! ```
//! use rb_hist::{Accumulator, Axis, Histogram};
//!
//! let mut a = Histogram::new("dose", "", vec![Axis::uniform(1, 0.0, 1.0).unwrap()]).unwrap();
//! a.set_bin(&[0], 2.0, 0.0);
//! let a = a.with_entries(1);
//!
//! let mut acc = Accumulator::mean_merge(&a);
//! acc.accumulate(&a).unwrap();
//! let merged = acc.terminate();
//! assert_eq!(merged.entries(), 1);
//! assert_eq!(merged.content(&[0]), Some(2.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod bin_array;
pub mod error;
pub mod histogram;
pub mod moments;
pub mod reducer;
pub mod shape;

pub use accumulator::{Accumulator, Folded, MergeStrategy};
pub use bin_array::BinArray;
pub use error::{HistError, Result};
pub use histogram::{Axis, ErrorConvention, Histogram};
pub use moments::MeanMoments;
pub use reducer::PerEntryReducer;
pub use shape::{CellIndex, Cells, MAX_DIMS, Shape};
