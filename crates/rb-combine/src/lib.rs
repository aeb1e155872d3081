//! # rb-combine
//!
//! Merges the histograms of many analysis output files into one.
//!
//! A [`HistogramCatalog`] is built from the first valid input; each catalogued
//! histogram is mean-merged or summed across all inputs according to the
//! name of its parent group ([`MergeRules`]), and the result is written to a
//! fresh output file together with the summed event bookkeeping. The output
//! is itself a valid input, so combines can be stacked.
//!
//! ```no_run
//! use rb_combine::{CombineOptions, combine};
//! use rb_store::ContainerStore;
//!
//! let inputs: Vec<std::path::PathBuf> = vec!["a.json".into(), "b.json".into()];
//! let report = combine(&ContainerStore, "ab.json".as_ref(), &inputs, &CombineOptions::default())
//!     .unwrap();
//! println!("{}", report.summary());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod orchestrator;

pub use catalog::{AuxiliaryEntry, CatalogEntry, HistogramCatalog, MergeKind, MergedHistogram};
pub use config::{CombineConfig, CombineOptions, MergeRules, read_config};
pub use orchestrator::{
    ACCEPTED_DATA_TYPES, CombineReport, EntryIssue, SkippedSource, check_output_path, combine,
};
