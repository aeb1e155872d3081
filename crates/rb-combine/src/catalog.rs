//! Discovery of mergeable histograms in a reference source.

use std::collections::HashSet;
use std::fmt;

use rb_core::{AuxiliaryObject, ChildKind, Error, ObjectPath, Result, StructuredSource};
use rb_hist::{Accumulator, Folded, HistError, Histogram, MergeStrategy};
use serde::Serialize;

use crate::config::MergeRules;

/// How a catalogued histogram is combined across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// Sample-weighted mean merge.
    MeanMerge,
    /// Elementwise sum.
    Sum,
    /// Not merged and not written.
    Skip,
}

impl MergeKind {
    /// Accumulator strategy, `None` for [`MergeKind::Skip`].
    pub fn strategy(self) -> Option<MergeStrategy> {
        match self {
            MergeKind::MeanMerge => Some(MergeStrategy::MeanMerge),
            MergeKind::Sum => Some(MergeStrategy::Sum),
            MergeKind::Skip => None,
        }
    }
}

impl fmt::Display for MergeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeKind::MeanMerge => "mean",
            MergeKind::Sum => "sum",
            MergeKind::Skip => "skip",
        })
    }
}

/// One discovered histogram path with its accumulator.
#[derive(Debug)]
pub struct CatalogEntry {
    /// Group path from the root.
    pub path: Vec<String>,
    /// Histogram name.
    pub name: String,
    /// Dimensionality (1–4).
    pub dims: usize,
    /// Merge kind chosen from the parent group name.
    pub kind: MergeKind,
    accumulator: Option<Accumulator>,
    failed: bool,
}

/// What happened when one entry met one source.
#[derive(Debug)]
pub(crate) enum Step {
    /// Folded into the accumulator.
    Merged,
    /// Skip entry, or an entry already failed earlier.
    Inactive,
    /// Histogram absent from the source.
    Missing,
    /// Mean histogram with zero entries but non-zero contents; nothing merged.
    NoEntries,
    /// Source object could not be used for this entry; state untouched.
    Refused(Error),
    /// Binning disagreement; the entry stops accumulating.
    Failed(Error),
}

impl CatalogEntry {
    /// Location of the histogram.
    pub fn object_path(&self) -> ObjectPath {
        ObjectPath::new(&self.path, self.name.clone())
    }

    /// Whether this entry still accumulates and will be written.
    pub fn is_active(&self) -> bool {
        self.accumulator.is_some() && !self.failed
    }

    /// Running accumulator, `None` for skipped entries.
    pub fn accumulator(&self) -> Option<&Accumulator> {
        self.accumulator.as_ref()
    }

    /// Look the histogram up in `source`; `Ok(None)` when it is absent.
    pub fn match_in_source<S: StructuredSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Option<Histogram>> {
        match source.read_histogram(&self.path, &self.name) {
            Ok(h) => Ok(Some(h)),
            Err(Error::MissingHistogram { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub(crate) fn accumulate_from<S: StructuredSource + ?Sized>(&mut self, source: &S) -> Step {
        if !self.is_active() {
            return Step::Inactive;
        }
        let histogram = match self.match_in_source(source) {
            Ok(Some(h)) => h,
            Ok(None) => return Step::Missing,
            Err(e) => return Step::Refused(e),
        };
        let Some(acc) = self.accumulator.as_mut() else {
            return Step::Inactive;
        };
        match acc.accumulate(&histogram) {
            Ok(Folded::Merged) => Step::Merged,
            Ok(Folded::NoSamples) => {
                if histogram.contents().as_slice().iter().any(|&v| v != 0.0) {
                    Step::NoEntries
                } else {
                    Step::Merged
                }
            }
            Err(e @ HistError::ShapeMismatch { .. }) => {
                self.failed = true;
                Step::Failed(e.into())
            }
            Err(e) => Step::Refused(e.into()),
        }
    }

    pub(crate) fn terminate(self) -> Option<MergedHistogram> {
        if self.failed {
            return None;
        }
        let acc = self.accumulator?;
        Some(MergedHistogram { path: self.path, name: self.name, histogram: acc.terminate() })
    }
}

/// Final result of one catalog entry, keyed by the location it was found at.
#[derive(Debug, Clone)]
pub struct MergedHistogram {
    /// Group path from the root.
    pub path: Vec<String>,
    /// Name of the histogram within its group.
    pub name: String,
    /// Merged histogram.
    pub histogram: Histogram,
}

/// A non-histogram object found in the reference source.
#[derive(Debug, Clone)]
pub struct AuxiliaryEntry {
    /// Group path from the root.
    pub path: Vec<String>,
    /// Object name.
    pub name: String,
    /// The object itself, copied verbatim to the output.
    pub object: AuxiliaryObject,
}

/// Every histogram path of the reference source with its merge kind.
///
/// Built once from the first valid source; the set of entries does not change
/// afterwards.
#[derive(Debug, Default)]
pub struct HistogramCatalog {
    pub(crate) entries: Vec<CatalogEntry>,
    groups: Vec<Vec<String>>,
    auxiliary: Vec<AuxiliaryEntry>,
}

impl HistogramCatalog {
    /// Walk `source` recursively and catalogue its histograms.
    ///
    /// Each mergeable histogram seeds an accumulator shaped like itself; its
    /// contents are not merged here.
    pub fn build<S: StructuredSource + ?Sized>(source: &S, rules: &MergeRules) -> Result<Self> {
        let mut catalog = HistogramCatalog::default();
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        catalog.walk(source, rules, &mut path, &mut seen)?;
        log::debug!(
            "catalogued {} histograms ({} mergeable) and {} auxiliary objects in {}",
            catalog.entries.len(),
            catalog.entries.iter().filter(|e| e.kind != MergeKind::Skip).count(),
            catalog.auxiliary.len(),
            source.path().display()
        );
        Ok(catalog)
    }

    fn walk<S: StructuredSource + ?Sized>(
        &mut self,
        source: &S,
        rules: &MergeRules,
        path: &mut Vec<String>,
        seen: &mut HashSet<ObjectPath>,
    ) -> Result<()> {
        for child in source.list_children(path)? {
            if !seen.insert(ObjectPath::new(path, child.name.clone())) {
                continue;
            }
            match child.kind {
                ChildKind::Group => {
                    path.push(child.name);
                    self.groups.push(path.clone());
                    self.walk(source, rules, path, seen)?;
                    path.pop();
                }
                ChildKind::Histogram { dims } => {
                    let parent = path.last().map(String::as_str).unwrap_or("");
                    let kind = rules.classify(parent);
                    let accumulator = match kind.strategy() {
                        Some(strategy) => {
                            let reference = source.read_histogram(path, &child.name)?;
                            Some(Accumulator::new(strategy, &reference))
                        }
                        None => None,
                    };
                    self.entries.push(CatalogEntry {
                        path: path.clone(),
                        name: child.name,
                        dims,
                        kind,
                        accumulator,
                        failed: false,
                    });
                }
                ChildKind::Auxiliary { .. } => {
                    let object = source.read_auxiliary(path, &child.name)?;
                    self.auxiliary.push(AuxiliaryEntry {
                        path: path.clone(),
                        name: child.name,
                        object,
                    });
                }
            }
        }
        Ok(())
    }

    /// All entries in discovery order, skipped ones included.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries that are merged.
    pub fn mergeable(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| e.kind != MergeKind::Skip)
    }

    /// Every group path in discovery order.
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Non-histogram objects to copy verbatim.
    pub fn auxiliary(&self) -> &[AuxiliaryEntry] {
        &self.auxiliary
    }

    /// Number of entries, skipped ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no histogram was found.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finish every active entry.
    pub fn terminate(self) -> Vec<MergedHistogram> {
        self.entries.into_iter().filter_map(CatalogEntry::terminate).collect()
    }
}
